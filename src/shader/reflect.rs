//! Push-constant reflection on top of vulkano's SPIR-V parser.
//!
//! vulkano reports push-constant ranges but not member names, so the block
//! members are walked here to map names to byte offsets.

use thiserror::Error;
use vulkano::shader::spirv::{Decoration, Id, Instruction, Spirv, StorageClass, StructMemberInfo};

use super::uniform::{UniformKind, UniformLayout, UniformSlot};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReflectError {
    #[error("invalid SPIR-V module: {0}")]
    Invalid(String),
}

fn kind_of(spirv: &Spirv, type_id: Id) -> Option<UniformKind> {
    match *spirv.id(type_id).instruction() {
        Instruction::TypeBool { .. } => Some(UniformKind::Bool),
        Instruction::TypeInt {
            width: 32,
            signedness,
            ..
        } => Some(if signedness == 0 {
            UniformKind::UInt
        } else {
            UniformKind::Int
        }),
        Instruction::TypeFloat { width: 32, .. } => Some(UniformKind::Float),
        Instruction::TypeVector {
            component_type,
            component_count,
            ..
        } => (kind_of(spirv, component_type) == Some(UniformKind::Float)
            && (2..=4).contains(&component_count))
        .then_some(UniformKind::Vec(component_count)),
        Instruction::TypeMatrix {
            column_type,
            column_count,
            ..
        } => match kind_of(spirv, column_type)? {
            UniformKind::Vec(rows) if rows == column_count => Some(UniformKind::Mat(column_count)),
            _ => None,
        },
        _ => None,
    }
}

fn member_name(member: &StructMemberInfo) -> Option<&str> {
    member.iter_name().find_map(|instruction| match instruction {
        Instruction::MemberName { name, .. } => Some(name.as_str()),
        _ => None,
    })
}

/// Offset, matrix stride and row-major flag of a block member.
fn member_layout(member: &StructMemberInfo) -> (Option<u32>, u32, bool) {
    let mut offset = None;
    let mut matrix_stride = 0;
    let mut row_major = false;
    for instruction in member.iter_decoration() {
        let Instruction::MemberDecorate { decoration, .. } = instruction else {
            continue;
        };
        match *decoration {
            Decoration::Offset { byte_offset } => offset = Some(byte_offset),
            Decoration::MatrixStride { matrix_stride: stride } => matrix_stride = stride,
            Decoration::RowMajor => row_major = true,
            _ => {}
        }
    }
    (offset, matrix_stride, row_major)
}

/// Structs behind every `PushConstant` variable of the module.
fn push_constant_blocks(spirv: &Spirv) -> impl Iterator<Item = Id> + '_ {
    spirv.iter_global().filter_map(|instruction| match *instruction {
        Instruction::Variable {
            result_type_id,
            storage_class: StorageClass::PushConstant,
            ..
        } => match *spirv.id(result_type_id).instruction() {
            Instruction::TypePointer { ty, .. } => Some(ty),
            _ => None,
        },
        _ => None,
    })
}

/// Maps every named member of the module's push-constant block.
pub fn push_constant_layout(words: &[u32]) -> Result<UniformLayout, ReflectError> {
    let spirv = Spirv::new(words).map_err(|err| ReflectError::Invalid(err.to_string()))?;

    let mut layout = UniformLayout::default();
    for block in push_constant_blocks(&spirv) {
        let info = spirv.id(block);
        let Instruction::TypeStruct { member_types, .. } = info.instruction() else {
            continue;
        };
        for (member, member_type) in info.iter_members().zip(member_types) {
            let Some(name) = member_name(member) else {
                continue;
            };
            let (Some(offset), matrix_stride, row_major) = member_layout(member) else {
                continue;
            };
            match kind_of(&spirv, *member_type) {
                Some(kind) => layout.insert(
                    name,
                    UniformSlot {
                        offset,
                        kind,
                        matrix_stride,
                        row_major,
                    },
                ),
                None => tracing::debug!("Push constant `{name}` has an unsupported type"),
            }
        }
    }
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAGIC: u32 = 0x0723_0203;

    const OP_MEMORY_MODEL: u32 = 14;
    const OP_CAPABILITY: u32 = 17;
    const OP_MEMBER_NAME: u32 = 6;
    const OP_TYPE_INT: u32 = 21;
    const OP_TYPE_FLOAT: u32 = 22;
    const OP_TYPE_VECTOR: u32 = 23;
    const OP_TYPE_MATRIX: u32 = 24;
    const OP_TYPE_STRUCT: u32 = 30;
    const OP_TYPE_POINTER: u32 = 32;
    const OP_VARIABLE: u32 = 59;
    const OP_MEMBER_DECORATE: u32 = 72;

    const ROW_MAJOR: u32 = 4;
    const COL_MAJOR: u32 = 5;
    const MATRIX_STRIDE: u32 = 7;
    const OFFSET: u32 = 35;

    const UNIFORM: u32 = 2;
    const PUSH_CONSTANT: u32 = 9;

    fn instruction(opcode: u32, operands: &[u32]) -> Vec<u32> {
        let count = u32::try_from(operands.len() + 1).unwrap();
        let mut words = vec![(count << 16) | opcode];
        words.extend_from_slice(operands);
        words
    }

    fn string(text: &str) -> Vec<u32> {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        while bytes.len() % 4 != 0 {
            bytes.push(0);
        }
        bytes
            .chunks(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn member_name(id: u32, index: u32, name: &str) -> Vec<u32> {
        let mut operands = vec![id, index];
        operands.extend(string(name));
        instruction(OP_MEMBER_NAME, &operands)
    }

    /// Header, `OpCapability Shader` and `OpMemoryModel Logical GLSL450`.
    fn preamble() -> Vec<u32> {
        let mut words = vec![MAGIC, 0x0001_0000, 0, 100, 0];
        words.extend(instruction(OP_CAPABILITY, &[1]));
        words.extend(instruction(OP_MEMORY_MODEL, &[0, 1]));
        words
    }

    /// Assembles a module equivalent to:
    ///
    /// ```glsl
    /// layout(push_constant) uniform Params {
    ///     vec3 origin;   // offset 0
    ///     float radius;  // offset 12
    ///     int count;     // offset 16
    ///     mat4 view;     // offset 32
    ///     double unused; // offset 96
    /// };
    /// ```
    fn sample_module() -> Vec<u32> {
        let mut words = preamble();
        words.extend(member_name(10, 0, "origin"));
        words.extend(member_name(10, 1, "radius"));
        words.extend(member_name(10, 2, "count"));
        words.extend(member_name(10, 3, "view"));
        words.extend(member_name(10, 4, "unused"));
        words.extend(instruction(OP_MEMBER_DECORATE, &[10, 0, OFFSET, 0]));
        words.extend(instruction(OP_MEMBER_DECORATE, &[10, 1, OFFSET, 12]));
        words.extend(instruction(OP_MEMBER_DECORATE, &[10, 2, OFFSET, 16]));
        words.extend(instruction(OP_MEMBER_DECORATE, &[10, 3, COL_MAJOR]));
        words.extend(instruction(OP_MEMBER_DECORATE, &[10, 3, OFFSET, 32]));
        words.extend(instruction(OP_MEMBER_DECORATE, &[10, 3, MATRIX_STRIDE, 16]));
        words.extend(instruction(OP_MEMBER_DECORATE, &[10, 4, OFFSET, 96]));
        words.extend(instruction(OP_TYPE_FLOAT, &[2, 32]));
        words.extend(instruction(OP_TYPE_VECTOR, &[3, 2, 3]));
        words.extend(instruction(OP_TYPE_INT, &[4, 32, 1]));
        words.extend(instruction(OP_TYPE_VECTOR, &[5, 2, 4]));
        words.extend(instruction(OP_TYPE_MATRIX, &[6, 5, 4]));
        words.extend(instruction(OP_TYPE_FLOAT, &[7, 64]));
        words.extend(instruction(OP_TYPE_STRUCT, &[10, 3, 2, 4, 6, 7]));
        words.extend(instruction(OP_TYPE_POINTER, &[11, PUSH_CONSTANT, 10]));
        words.extend(instruction(OP_VARIABLE, &[11, 12, PUSH_CONSTANT]));
        words
    }

    #[test]
    fn maps_members_of_the_push_constant_block() {
        let layout = push_constant_layout(&sample_module()).unwrap();

        assert_eq!(
            layout.get("origin"),
            Some(&UniformSlot {
                offset: 0,
                kind: UniformKind::Vec(3),
                matrix_stride: 0,
                row_major: false,
            })
        );
        assert_eq!(layout.get("radius").map(|s| s.offset), Some(12));
        assert_eq!(layout.get("count").map(|s| s.kind), Some(UniformKind::Int));
        assert_eq!(
            layout.get("view"),
            Some(&UniformSlot {
                offset: 32,
                kind: UniformKind::Mat(4),
                matrix_stride: 16,
                row_major: false,
            })
        );
    }

    #[test]
    fn unsupported_member_types_are_left_out() {
        let layout = push_constant_layout(&sample_module()).unwrap();
        assert!(layout.get("unused").is_none());
    }

    #[test]
    fn row_major_matrices_are_flagged() {
        let mut words = preamble();
        words.extend(member_name(10, 0, "m"));
        words.extend(instruction(OP_MEMBER_DECORATE, &[10, 0, ROW_MAJOR]));
        words.extend(instruction(OP_MEMBER_DECORATE, &[10, 0, OFFSET, 0]));
        words.extend(instruction(OP_MEMBER_DECORATE, &[10, 0, MATRIX_STRIDE, 8]));
        words.extend(instruction(OP_TYPE_FLOAT, &[2, 32]));
        words.extend(instruction(OP_TYPE_VECTOR, &[3, 2, 2]));
        words.extend(instruction(OP_TYPE_MATRIX, &[4, 3, 2]));
        words.extend(instruction(OP_TYPE_STRUCT, &[10, 4]));
        words.extend(instruction(OP_TYPE_POINTER, &[11, PUSH_CONSTANT, 10]));
        words.extend(instruction(OP_VARIABLE, &[11, 12, PUSH_CONSTANT]));

        let layout = push_constant_layout(&words).unwrap();
        assert_eq!(
            layout.get("m"),
            Some(&UniformSlot {
                offset: 0,
                kind: UniformKind::Mat(2),
                matrix_stride: 8,
                row_major: true,
            })
        );
    }

    #[test]
    fn structs_outside_push_constants_are_ignored() {
        let mut words = preamble();
        words.extend(member_name(10, 0, "color"));
        words.extend(instruction(OP_MEMBER_DECORATE, &[10, 0, OFFSET, 0]));
        words.extend(instruction(OP_TYPE_FLOAT, &[2, 32]));
        words.extend(instruction(OP_TYPE_STRUCT, &[10, 2]));
        words.extend(instruction(OP_TYPE_POINTER, &[11, UNIFORM, 10]));
        words.extend(instruction(OP_VARIABLE, &[11, 12, UNIFORM]));

        assert!(push_constant_layout(&words).unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_modules() {
        assert!(matches!(
            push_constant_layout(&[]),
            Err(ReflectError::Invalid(_))
        ));
        assert!(matches!(
            push_constant_layout(&[0xdead_beef, 0, 0, 0, 0]),
            Err(ReflectError::Invalid(_))
        ));

        let mut words = sample_module();
        words.push((5 << 16) | OP_TYPE_FLOAT);
        assert!(matches!(
            push_constant_layout(&words),
            Err(ReflectError::Invalid(_))
        ));
    }
}
