//! Variable registry - the layout of every exchanged variable
//!
//! Each variable has a fixed slot in a fixed-size block:
//!
//! ```text
//! [0 .. 4)            block number (LE u32)
//! [4 .. )             variable payloads at their registered offsets
//! [ .. 248)           0xFF filler
//! [248 .. 256)        Fletcher-64 checksum (LE u64)
//! ```
//!
//! The registry is built once, validated, and then only read.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{GxError, GxResult};

/// Size of every block on the wire
pub const BLOCK_SIZE: usize = 256;

/// Bytes taken by the block number header
pub const BLOCK_NUMBER_SIZE: usize = 4;

/// Bytes taken by the checksum trailer
pub const CHECKSUM_SIZE: usize = 8;

/// Number of blocks in the built-in layout
pub const NUMBER_OF_BLOCKS: u32 = 1;

pub const FIRST_MESSAGE: &str = "FirstMessage";
pub const FIRST_NUMBER: &str = "FirstNumber";
pub const FIRST_LONG: &str = "FirstLong";

/// Exchangeable value types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VariableType {
    /// UTF-8, fixed width, padded or truncated to its slot
    String,
    Int32,
    Int64,
}

impl VariableType {
    /// Byte width produced by the converter, when fixed by the type itself
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            VariableType::String => None,
            VariableType::Int32 => Some(4),
            VariableType::Int64 => Some(8),
        }
    }
}

/// Layout and arbitration attributes of one variable
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableAttributes {
    pub name: String,
    pub var_type: VariableType,
    /// Slot width in bytes
    pub length: usize,
    /// 1-based block the variable travels in
    pub block_number: u32,
    /// Byte offset of the slot inside the block
    pub offset_in_block: usize,
    /// Client writes win conflicts with sim writes
    pub user_is_boss: bool,
}

impl VariableAttributes {
    pub fn new(
        name: impl Into<String>,
        var_type: VariableType,
        length: usize,
        block_number: u32,
        offset_in_block: usize,
        user_is_boss: bool,
    ) -> Self {
        VariableAttributes {
            name: name.into(),
            var_type,
            length,
            block_number,
            offset_in_block,
            user_is_boss,
        }
    }

    /// Byte range of the slot
    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset_in_block..self.offset_in_block + self.length
    }
}

/// Whether values of this type are padded or truncated to their slot
pub fn size_matters(var_type: VariableType) -> bool {
    match var_type {
        VariableType::String => true,
        VariableType::Int32 | VariableType::Int64 => false,
    }
}

/// The built-in variable table
pub fn builtin_variables() -> Vec<VariableAttributes> {
    vec![
        VariableAttributes::new(FIRST_MESSAGE, VariableType::String, 10, 1, 0x0004, false),
        VariableAttributes::new(FIRST_NUMBER, VariableType::Int32, 4, 1, 0x000E, false),
        VariableAttributes::new(FIRST_LONG, VariableType::Int64, 8, 1, 0x0012, true),
    ]
}

/// Immutable registry of variable layouts
#[derive(Clone, Debug)]
pub struct Registry {
    variables: HashMap<String, VariableAttributes>,
    /// Names per block, ordered by offset
    blocks: BTreeMap<u32, Vec<String>>,
    number_of_blocks: u32,
}

impl Registry {
    /// Registry with the built-in table
    pub fn builtin() -> Self {
        // validated in test_builtin_is_valid
        Self::assemble(builtin_variables(), NUMBER_OF_BLOCKS)
    }

    /// Build and validate a registry
    pub fn new(entries: Vec<VariableAttributes>, number_of_blocks: u32) -> GxResult<Self> {
        validate(&entries, number_of_blocks)?;
        Ok(Self::assemble(entries, number_of_blocks))
    }

    fn assemble(entries: Vec<VariableAttributes>, number_of_blocks: u32) -> Self {
        let mut by_block: BTreeMap<u32, Vec<(usize, String)>> = BTreeMap::new();
        for attrs in &entries {
            by_block
                .entry(attrs.block_number)
                .or_default()
                .push((attrs.offset_in_block, attrs.name.clone()));
        }

        let blocks = by_block
            .into_iter()
            .map(|(block, mut names)| {
                names.sort();
                (block, names.into_iter().map(|(_, name)| name).collect())
            })
            .collect();

        let variables = entries
            .into_iter()
            .map(|attrs| (attrs.name.clone(), attrs))
            .collect();

        Registry {
            variables,
            blocks,
            number_of_blocks,
        }
    }

    /// All variables, keyed by name
    pub fn all_variables(&self) -> &HashMap<String, VariableAttributes> {
        &self.variables
    }

    /// Attributes of a variable
    pub fn find(&self, name: &str) -> GxResult<&VariableAttributes> {
        if name.trim().is_empty() {
            return Err(GxError::InvalidArgument(
                "variable name may not be blank".into(),
            ));
        }
        self.variables
            .get(name)
            .ok_or_else(|| GxError::VariableNotFound(name.to_owned()))
    }

    /// Names registered to a block, ordered by offset
    pub fn variables_in_block(&self, block_number: u32) -> Option<&[String]> {
        self.blocks.get(&block_number).map(Vec::as_slice)
    }

    pub fn number_of_blocks(&self) -> u32 {
        self.number_of_blocks
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

fn validate(entries: &[VariableAttributes], number_of_blocks: u32) -> GxResult<()> {
    let payload_area = BLOCK_NUMBER_SIZE..BLOCK_SIZE - CHECKSUM_SIZE;
    let mut seen: HashSet<&str> = HashSet::new();
    let mut per_block: BTreeMap<u32, Vec<&VariableAttributes>> = BTreeMap::new();

    for attrs in entries {
        if attrs.name.trim().is_empty() {
            return Err(GxError::InvalidLayout("blank variable name".into()));
        }
        if !seen.insert(&attrs.name) {
            return Err(GxError::InvalidLayout(format!(
                "duplicate variable {}",
                attrs.name
            )));
        }
        if attrs.block_number < 1 || attrs.block_number > number_of_blocks {
            return Err(GxError::InvalidLayout(format!(
                "{} is in block {}, outside 1..={}",
                attrs.name, attrs.block_number, number_of_blocks
            )));
        }
        if attrs.length == 0 {
            return Err(GxError::InvalidLayout(format!("{} has no length", attrs.name)));
        }
        if let Some(width) = attrs.var_type.fixed_width() {
            if attrs.length != width {
                return Err(GxError::InvalidLayout(format!(
                    "{} is {:?} and needs {} bytes, not {}",
                    attrs.name, attrs.var_type, width, attrs.length
                )));
            }
        }
        let range = attrs.range();
        if range.start < payload_area.start || range.end > payload_area.end {
            return Err(GxError::InvalidLayout(format!(
                "{} occupies {:?}, outside the payload area {:?}",
                attrs.name, range, payload_area
            )));
        }
        per_block.entry(attrs.block_number).or_default().push(attrs);
    }

    for (block, mut members) in per_block {
        let used: usize = members.iter().map(|a| a.length).sum();
        if used + BLOCK_NUMBER_SIZE + CHECKSUM_SIZE > BLOCK_SIZE {
            return Err(GxError::BlockOverflow {
                used,
                capacity: BLOCK_SIZE - BLOCK_NUMBER_SIZE - CHECKSUM_SIZE,
            });
        }

        members.sort_by_key(|a| a.offset_in_block);
        for pair in members.windows(2) {
            if pair[0].range().end > pair[1].offset_in_block {
                return Err(GxError::InvalidLayout(format!(
                    "{} and {} overlap in block {}",
                    pair[0].name, pair[1].name, block
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_valid() {
        let registry = Registry::new(builtin_variables(), NUMBER_OF_BLOCKS).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.number_of_blocks(), 1);
    }

    #[test]
    fn test_find() {
        let registry = Registry::builtin();

        let number = registry.find(FIRST_NUMBER).unwrap();
        assert_eq!(number.var_type, VariableType::Int32);
        assert_eq!(number.length, 4);
        assert_eq!(number.offset_in_block, 0x0E);
        assert!(!number.user_is_boss);

        assert!(registry.find(FIRST_LONG).unwrap().user_is_boss);
    }

    #[test]
    fn test_find_unknown_and_blank() {
        let registry = Registry::builtin();
        assert_eq!(
            registry.find("NoSuchThing"),
            Err(GxError::VariableNotFound("NoSuchThing".into()))
        );
        assert!(matches!(registry.find(""), Err(GxError::InvalidArgument(_))));
        assert!(matches!(registry.find("  "), Err(GxError::InvalidArgument(_))));
    }

    #[test]
    fn test_size_matters() {
        assert!(size_matters(VariableType::String));
        assert!(!size_matters(VariableType::Int32));
        assert!(!size_matters(VariableType::Int64));
    }

    #[test]
    fn test_block_contents_ordered_by_offset() {
        let registry = Registry::builtin();
        assert_eq!(
            registry.variables_in_block(1).unwrap(),
            &[FIRST_MESSAGE, FIRST_NUMBER, FIRST_LONG]
        );
        assert!(registry.variables_in_block(2).is_none());
    }

    #[test]
    fn test_overlap_rejected() {
        let entries = vec![
            VariableAttributes::new("A", VariableType::Int32, 4, 1, 4, false),
            VariableAttributes::new("B", VariableType::Int32, 4, 1, 6, false),
        ];
        assert!(matches!(
            Registry::new(entries, 1),
            Err(GxError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_same_offset_in_different_blocks() {
        let entries = vec![
            VariableAttributes::new("A", VariableType::Int32, 4, 1, 4, false),
            VariableAttributes::new("B", VariableType::Int32, 4, 2, 4, false),
        ];
        let registry = Registry::new(entries, 2).unwrap();
        assert_eq!(registry.variables_in_block(2).unwrap(), &["B"]);
    }

    #[test]
    fn test_slot_must_avoid_header_and_trailer() {
        let over_header = vec![VariableAttributes::new("A", VariableType::Int32, 4, 1, 2, false)];
        assert!(Registry::new(over_header, 1).is_err());

        let over_trailer = vec![VariableAttributes::new(
            "A",
            VariableType::String,
            10,
            1,
            BLOCK_SIZE - CHECKSUM_SIZE - 5,
            false,
        )];
        assert!(Registry::new(over_trailer, 1).is_err());
    }

    #[test]
    fn test_block_number_range() {
        let entries = vec![VariableAttributes::new("A", VariableType::Int32, 4, 3, 4, false)];
        assert!(Registry::new(entries.clone(), 2).is_err());
        assert!(Registry::new(entries, 3).is_ok());
    }

    #[test]
    fn test_integer_width_enforced() {
        let entries = vec![VariableAttributes::new("A", VariableType::Int64, 4, 1, 4, false)];
        assert!(Registry::new(entries, 1).is_err());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let entries = vec![
            VariableAttributes::new("A", VariableType::Int32, 4, 1, 4, false),
            VariableAttributes::new("A", VariableType::Int32, 4, 1, 8, false),
        ];
        assert!(Registry::new(entries, 1).is_err());
    }
}
