use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use glam::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};

/// A value written to a named uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat2(Mat2),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl UniformValue {
    const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Vec2(_) => "vec2",
            Self::Vec3(_) => "vec3",
            Self::Vec4(_) => "vec4",
            Self::Mat2(_) => "mat2",
            Self::Mat3(_) => "mat3",
            Self::Mat4(_) => "mat4",
        }
    }

    const fn fits(&self, kind: UniformKind) -> bool {
        matches!(
            (self, kind),
            (Self::Bool(_), UniformKind::Bool | UniformKind::Int | UniformKind::UInt)
                | (Self::Int(_), UniformKind::Int | UniformKind::UInt)
                | (Self::Float(_), UniformKind::Float)
                | (Self::Vec2(_), UniformKind::Vec(2))
                | (Self::Vec3(_), UniformKind::Vec(3))
                | (Self::Vec4(_), UniformKind::Vec(4))
                | (Self::Mat2(_), UniformKind::Mat(2))
                | (Self::Mat3(_), UniformKind::Mat(3))
                | (Self::Mat4(_), UniformKind::Mat(4))
        )
    }

    /// Columns of 32-bit words; scalars and vectors are a single column.
    fn columns(&self) -> Vec<Vec<u32>> {
        fn floats(values: &[f32]) -> Vec<u32> {
            values.iter().map(|v| v.to_bits()).collect()
        }
        match self {
            Self::Bool(value) => vec![vec![u32::from(*value)]],
            #[allow(clippy::cast_sign_loss)]
            Self::Int(value) => vec![vec![*value as u32]],
            Self::Float(value) => vec![vec![value.to_bits()]],
            Self::Vec2(value) => vec![floats(&value.to_array())],
            Self::Vec3(value) => vec![floats(&value.to_array())],
            Self::Vec4(value) => vec![floats(&value.to_array())],
            Self::Mat2(value) => value.to_cols_array_2d().iter().map(|c| floats(c)).collect(),
            Self::Mat3(value) => value.to_cols_array_2d().iter().map(|c| floats(c)).collect(),
            Self::Mat4(value) => value.to_cols_array_2d().iter().map(|c| floats(c)).collect(),
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for UniformValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from_value!(
    bool => Bool,
    i32 => Int,
    f32 => Float,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Vec4,
    Mat2 => Mat2,
    Mat3 => Mat3,
    Mat4 => Mat4,
);

/// Type of a push-constant member as declared by the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Bool,
    Int,
    UInt,
    Float,
    /// Float vector with 2 to 4 components.
    Vec(u32),
    /// Square float matrix with 2 to 4 columns.
    Mat(u32),
}

/// Where a uniform lives inside the push-constant block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    pub offset: u32,
    pub kind: UniformKind,
    /// Byte distance between matrix columns, or rows when `row_major`;
    /// unused for other kinds.
    pub matrix_stride: u32,
    pub row_major: bool,
}

/// Uniform name to slot mapping of one program stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformLayout {
    slots: BTreeMap<String, UniformSlot>,
}

impl UniformLayout {
    pub fn insert(&mut self, name: impl Into<String>, slot: UniformSlot) {
        self.slots.insert(name.into(), slot);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&UniformSlot> {
        self.slots.get(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Merges the layout of another stage sharing the same push-constant block.
    ///
    /// Returns the name of the first member both stages declare differently.
    pub fn merge(&mut self, other: &Self) -> Result<(), String> {
        for (name, slot) in &other.slots {
            match self.slots.get(name) {
                Some(existing) if existing != slot => return Err(name.clone()),
                Some(_) => {}
                None => {
                    self.slots.insert(name.clone(), *slot);
                }
            }
        }
        Ok(())
    }
}

/// Outcome of a uniform write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformWrite {
    Written,
    /// No stage declares the name; the write was skipped.
    Unresolved,
    /// The declared type differs from the value; the write was skipped.
    TypeMismatch,
}

/// Host copy of a push-constant block.
///
/// Every 32-bit word of the block's ranges is tracked so the whole block can
/// be pushed before each draw or dispatch.
#[derive(Debug, Clone, Default)]
pub struct UniformBlock {
    layout: UniformLayout,
    words: BTreeMap<u32, u32>,
}

impl UniformBlock {
    pub fn new(layout: UniformLayout, ranges: impl IntoIterator<Item = Range<u32>>) -> Self {
        let offsets = ranges
            .into_iter()
            .flat_map(|range| range.step_by(4))
            .collect::<BTreeSet<_>>();
        Self {
            layout,
            words: offsets.into_iter().map(|offset| (offset, 0)).collect(),
        }
    }

    #[must_use]
    pub const fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.layout.get(name).is_some()
    }

    /// Writes `value` into the slot named `name`.
    pub fn set(&mut self, name: &str, value: UniformValue) -> UniformWrite {
        let Some(slot) = self.layout.get(name).copied() else {
            return UniformWrite::Unresolved;
        };
        if !value.fits(slot.kind) {
            tracing::warn!(
                "Uniform `{name}` is declared as {:?}, cannot write a {}",
                slot.kind,
                value.type_name()
            );
            return UniformWrite::TypeMismatch;
        }

        let stride = if slot.matrix_stride == 0 {
            16
        } else {
            slot.matrix_stride
        };
        let mut writes = Vec::new();
        for (column_index, column) in (0u32..).zip(value.columns()) {
            for (row_index, word) in (0u32..).zip(column) {
                let (major, minor) = if slot.row_major {
                    (row_index, column_index)
                } else {
                    (column_index, row_index)
                };
                writes.push((slot.offset + major * stride + minor * 4, word));
            }
        }

        if let Some((offset, _)) = writes.iter().find(|(offset, _)| !self.words.contains_key(offset)) {
            tracing::warn!("Uniform `{name}` reaches byte {offset}, outside the push-constant range");
            return UniformWrite::Unresolved;
        }
        for (offset, word) in writes {
            self.words.insert(offset, word);
        }
        UniformWrite::Written
    }

    /// `(byte offset, word)` pairs covering every pushed range.
    pub fn words(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.words.iter().map(|(offset, word)| (*offset, *word))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(offset: u32, kind: UniformKind) -> UniformSlot {
        UniformSlot {
            offset,
            kind,
            matrix_stride: 0,
            row_major: false,
        }
    }

    fn word_at(block: &UniformBlock, offset: u32) -> u32 {
        block
            .words()
            .find(|(o, _)| *o == offset)
            .map(|(_, w)| w)
            .unwrap()
    }

    #[test]
    fn writes_scalars_and_vectors_at_their_offsets() {
        let mut layout = UniformLayout::default();
        layout.insert("time", slot(0, UniformKind::Float));
        layout.insert("origin", slot(16, UniformKind::Vec(3)));
        let mut block = UniformBlock::new(layout, [0..32]);

        assert_eq!(block.set("time", 2.5_f32.into()), UniformWrite::Written);
        assert_eq!(
            block.set("origin", Vec3::new(1.0, 2.0, 3.0).into()),
            UniformWrite::Written
        );

        assert_eq!(f32::from_bits(word_at(&block, 0)), 2.5);
        assert_eq!(f32::from_bits(word_at(&block, 16)), 1.0);
        assert_eq!(f32::from_bits(word_at(&block, 20)), 2.0);
        assert_eq!(f32::from_bits(word_at(&block, 24)), 3.0);
        assert_eq!(word_at(&block, 28), 0);
    }

    #[test]
    fn unknown_names_are_skipped() {
        let mut block = UniformBlock::new(UniformLayout::default(), []);
        assert_eq!(block.set("missing", 1.0_f32.into()), UniformWrite::Unresolved);
        assert!(block.is_empty());
    }

    #[test]
    fn mismatched_types_are_skipped() {
        let mut layout = UniformLayout::default();
        layout.insert("count", slot(0, UniformKind::Int));
        let mut block = UniformBlock::new(layout, [0..4]);

        assert_eq!(
            block.set("count", Vec2::ONE.into()),
            UniformWrite::TypeMismatch
        );
        assert_eq!(word_at(&block, 0), 0);
        assert_eq!(block.set("count", (-1_i32).into()), UniformWrite::Written);
        assert_eq!(word_at(&block, 0), u32::MAX);
    }

    #[test]
    fn bools_land_in_integer_slots() {
        let mut layout = UniformLayout::default();
        layout.insert("enabled", slot(0, UniformKind::UInt));
        let mut block = UniformBlock::new(layout, [0..4]);

        assert_eq!(block.set("enabled", true.into()), UniformWrite::Written);
        assert_eq!(word_at(&block, 0), 1);
    }

    #[test]
    fn matrix_columns_follow_the_declared_stride() {
        let mut layout = UniformLayout::default();
        layout.insert(
            "basis",
            UniformSlot {
                offset: 0,
                kind: UniformKind::Mat(3),
                matrix_stride: 16,
                row_major: false,
            },
        );
        let mut block = UniformBlock::new(layout, [0..48]);

        let basis = Mat3::from_cols(Vec3::X, Vec3::Y * 2.0, Vec3::Z * 3.0);
        assert_eq!(block.set("basis", basis.into()), UniformWrite::Written);

        assert_eq!(f32::from_bits(word_at(&block, 0)), 1.0);
        assert_eq!(f32::from_bits(word_at(&block, 20)), 2.0);
        assert_eq!(f32::from_bits(word_at(&block, 40)), 3.0);
        // Column padding stays untouched.
        assert_eq!(word_at(&block, 12), 0);
    }

    #[test]
    fn row_major_matrices_are_stored_by_rows() {
        let mut layout = UniformLayout::default();
        layout.insert(
            "m",
            UniformSlot {
                offset: 0,
                kind: UniformKind::Mat(2),
                matrix_stride: 8,
                row_major: true,
            },
        );
        let mut block = UniformBlock::new(layout, [0..16]);

        let m = Mat2::from_cols(Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0));
        assert_eq!(block.set("m", m.into()), UniformWrite::Written);

        let stored = block
            .words()
            .map(|(_, word)| f32::from_bits(word))
            .collect::<Vec<_>>();
        assert_eq!(stored, vec![1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn writes_outside_the_pushed_range_are_rejected() {
        let mut layout = UniformLayout::default();
        layout.insert("far", slot(8, UniformKind::Vec(4)));
        let mut block = UniformBlock::new(layout, [0..16]);

        assert_eq!(block.set("far", Vec4::ONE.into()), UniformWrite::Unresolved);
        assert!(block.words().all(|(_, word)| word == 0));
    }

    #[test]
    fn overlapping_ranges_share_words() {
        let block = UniformBlock::new(UniformLayout::default(), [0..16, 8..24]);
        let offsets = block.words().map(|(offset, _)| offset).collect::<Vec<_>>();
        assert_eq!(offsets, vec![0, 4, 8, 12, 16, 20]);
    }

    #[test]
    fn merge_rejects_conflicting_declarations() {
        let mut vertex = UniformLayout::default();
        vertex.insert("scale", slot(0, UniformKind::Float));
        let mut fragment = UniformLayout::default();
        fragment.insert("scale", slot(0, UniformKind::Float));
        fragment.insert("tint", slot(16, UniformKind::Vec(4)));

        vertex.merge(&fragment).unwrap();
        assert_eq!(vertex.names().collect::<Vec<_>>(), vec!["scale", "tint"]);

        let mut other = UniformLayout::default();
        other.insert("tint", slot(32, UniformKind::Vec(4)));
        assert_eq!(vertex.merge(&other), Err("tint".to_string()));
    }
}
