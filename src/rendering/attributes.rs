/// Named slots inside flat float arrays.
///
/// Shading stages fetch vertex attributes and uniforms by name; the
/// pipeline only knows where each name lives, never what it means.
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Location of one named value inside a flat `f32` array.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Slot {
    /// Number of floats.
    pub size: usize,
    /// Offset of the first float.
    pub offset: usize,
}

impl Slot {
    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.size
    }
}

#[derive(Clone, Debug, Default)]
pub struct SlotRegistry {
    slots: HashMap<String, Slot>,
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, replacing any previous descriptor.
    pub fn define(&mut self, name: &str, size: usize, offset: usize) {
        self.slots.insert(name.to_owned(), Slot { size, offset });
    }

    pub fn get(&self, name: &str) -> Result<Slot> {
        self.slots
            .get(name)
            .copied()
            .ok_or_else(|| Error::AttributeNotFound(name.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Fetch the floats of `name` out of `data`.
    ///
    /// A slot that runs past the end of `data` is reported as missing
    /// rather than panicking.
    pub fn fetch<'d>(&self, name: &str, data: &'d [f32]) -> Result<&'d [f32]> {
        let slot = self.get(name)?;
        data.get(slot.range())
            .ok_or_else(|| Error::AttributeNotFound(name.to_owned()))
    }
}

/// Fixed-capacity uniform storage, re-filled every draw.
#[derive(Clone, Debug)]
pub struct UniformArena {
    data: Vec<f32>,
    cursor: usize,
    registry: SlotRegistry,
}

impl UniformArena {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity],
            cursor: 0,
            registry: SlotRegistry::new(),
        }
    }

    /// Floats still available before the arena is full.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    /// Copy `values` into the arena and register them under `name`.
    pub fn upload(&mut self, name: &str, values: &[f32]) -> Result<()> {
        let available = self.remaining();
        if values.len() > available {
            return Err(Error::UniformCapacityExceeded {
                name: name.to_owned(),
                requested: values.len(),
                available,
            });
        }

        let start = self.cursor;
        self.data[start..start + values.len()].copy_from_slice(values);
        self.registry.define(name, values.len(), start);
        self.cursor += values.len();
        Ok(())
    }

    /// Move the write cursor back to the start. Registered names stay
    /// readable until they are overwritten by the next uploads.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn get(&self, name: &str) -> Result<&[f32]> {
        self.registry.fetch(name, &self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redefining_replaces_descriptor() {
        let mut reg = SlotRegistry::new();
        assert!(reg.is_empty());
        reg.define("pos", 3, 0);
        reg.define("pos", 2, 4);
        assert_eq!(reg.get("pos").unwrap(), Slot { size: 2, offset: 4 });
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn missing_name_is_an_error() {
        let reg = SlotRegistry::new();
        assert!(matches!(reg.get("normal"), Err(Error::AttributeNotFound(n)) if n == "normal"));
    }

    #[test]
    fn fetch_past_end_is_reported_missing() {
        let mut reg = SlotRegistry::new();
        reg.define("uv", 2, 5);
        let data = [0.0; 6];
        assert!(reg.fetch("uv", &data).is_err());
    }

    #[test]
    fn arena_overflow_is_checked() {
        let mut arena = UniformArena::with_capacity(20);
        arena.upload("model", &[1.0; 16]).unwrap();
        let err = arena.upload("view", &[1.0; 16]).unwrap_err();
        match err {
            Error::UniformCapacityExceeded {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, 16);
                assert_eq!(available, 4);
            }
            other => panic!("unexpected error {other:?}"),
        }
        // The failed upload must not disturb what was already there.
        assert_eq!(arena.get("model").unwrap(), &[1.0; 16]);
    }

    #[test]
    fn rewind_keeps_values_until_overwritten() {
        let mut arena = UniformArena::with_capacity(8);
        arena.upload("a", &[1.0, 2.0]).unwrap();
        arena.rewind();
        assert_eq!(arena.get("a").unwrap(), &[1.0, 2.0]);
        arena.upload("b", &[7.0]).unwrap();
        assert_eq!(arena.get("b").unwrap(), &[7.0]);
        assert_eq!(arena.get("a").unwrap(), &[7.0, 2.0]);
        assert_eq!(arena.remaining(), 7);
    }
}
