use std::collections::TryReserveError;

use crate::geometry::Hex;

use super::Field;

/// Row-major array of Fields. Dimensions only change through [`FieldGrid::resize`],
/// which wipes every Field.
#[derive(Debug, Clone, Default)]
pub struct FieldGrid {
    width: u16,
    height: u16,
    fields: Vec<Field>,
}

impl FieldGrid {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            fields: vec![Field::default(); usize::from(width) * usize::from(height)],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, hex: Hex) -> bool {
        hex.x < self.width && hex.y < self.height
    }

    pub fn contains_i32(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < i32::from(self.width) && y < i32::from(self.height)
    }

    pub fn hex_at(&self, x: i32, y: i32) -> Option<Hex> {
        Hex::from_i32(x, y, self.width, self.height)
    }

    fn index(&self, hex: Hex) -> usize {
        usize::from(hex.y) * usize::from(self.width) + usize::from(hex.x)
    }

    /// Unchecked access; out-of-range coordinates panic like slice indexing.
    pub fn field(&self, hex: Hex) -> &Field {
        debug_assert!(self.contains(hex), "hex {hex:?} outside grid");
        let index = self.index(hex);
        &self.fields[index]
    }

    pub fn field_mut(&mut self, hex: Hex) -> &mut Field {
        debug_assert!(self.contains(hex), "hex {hex:?} outside grid");
        let index = self.index(hex);
        &mut self.fields[index]
    }

    pub fn get(&self, hex: Hex) -> Option<&Field> {
        if self.contains(hex) {
            Some(self.field(hex))
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, hex: Hex) -> Option<&mut Field> {
        if self.contains(hex) {
            Some(self.field_mut(hex))
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Hex, &Field)> + '_ {
        let width = usize::from(self.width.max(1));
        self.fields.iter().enumerate().map(move |(index, field)| {
            (
                Hex::new((index % width) as u16, (index / width) as u16),
                field,
            )
        })
    }

    pub(crate) fn resize(&mut self, width: u16, height: u16) -> Result<(), TryReserveError> {
        let count = usize::from(width) * usize::from(height);
        let mut fields = Vec::new();
        fields.try_reserve_exact(count)?;
        fields.resize(count, Field::default());
        self.fields = fields;
        self.width = width;
        self.height = height;
        Ok(())
    }

    pub(crate) fn clear(&mut self) {
        for field in &mut self.fields {
            field.clear();
        }
    }

    pub(crate) fn release(&mut self) {
        self.fields = Vec::new();
        self.width = 0;
        self.height = 0;
    }
}
