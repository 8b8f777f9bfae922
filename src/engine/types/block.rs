//! Block node types
//!
//! A block is opaque to the evaluator apart from these accessors: an opcode,
//! named fields holding literal data, named input slots that may connect to
//! other blocks, and optional structural metadata (the mutation).

use super::values::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Identifier of a block inside a block container
pub type BlockId = String;

/// Field that carries a variable reference instead of a literal
pub const VARIABLE_FIELD: &str = "VARIABLE";

/// Synthetic input of a procedure definition that holds its prototype.
/// It is structure, not data, and is never evaluated as an argument.
pub const CUSTOM_BLOCK_INPUT: &str = "custom_block";

/// Opcode of a procedure call that does not return a value.
/// Frames for this opcode are call boundaries.
pub const PROCEDURE_CALL_OPCODE: &str = "procedures_callnoreturn";

pub const PROCEDURE_DEFINITION_OPCODE: &str = "procedures_definition";
pub const PROCEDURE_PROTOTYPE_OPCODE: &str = "procedures_prototype";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub value: Value,
    /// Referenced entity (variable id) for reference fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Input {
    /// Connected block, if any
    #[serde(default)]
    pub block: Option<BlockId>,
    /// Shadow block that fills the slot when nothing is dropped into it
    #[serde(default)]
    pub shadow: Option<BlockId>,
}

/// Structural metadata of procedure blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    #[serde(default)]
    pub proccode: Option<String>,
    #[serde(default, rename = "argumentnames")]
    pub argument_names: Vec<String>,
    #[serde(default, rename = "argumentids")]
    pub argument_ids: Vec<String>,
    #[serde(default)]
    pub warp: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(default)]
    pub opcode: Option<String>,
    #[serde(default)]
    pub next: Option<BlockId>,
    #[serde(default)]
    pub parent: Option<BlockId>,
    #[serde(default)]
    pub fields: IndexMap<String, Field>,
    #[serde(default)]
    pub inputs: IndexMap<String, Input>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation: Option<Mutation>,
    #[serde(default)]
    pub top_level: bool,
    #[serde(default)]
    pub shadow: bool,
}

impl Block {
    pub fn new(opcode: impl Into<String>) -> Self {
        Self {
            opcode: Some(opcode.into()),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(
            name.into(),
            Field {
                value: value.into(),
                id: None,
            },
        );
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, block: impl Into<BlockId>) -> Self {
        self.inputs.insert(
            name.into(),
            Input {
                block: Some(block.into()),
                shadow: None,
            },
        );
        self
    }

    pub fn with_next(mut self, next: impl Into<BlockId>) -> Self {
        self.next = Some(next.into());
        self
    }

    pub fn top_level(mut self) -> Self {
        self.top_level = true;
        self
    }

    /// Procedure code of a call, prototype or definition block
    pub fn proccode(&self) -> Option<&str> {
        self.mutation.as_ref().and_then(|m| m.proccode.as_deref())
    }

    pub fn is_procedure_call(&self) -> bool {
        self.opcode.as_deref() == Some(PROCEDURE_CALL_OPCODE)
    }
}
