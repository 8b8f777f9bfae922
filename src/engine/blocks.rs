//! Block containers and targets
//!
//! `Blocks` is the store the evaluator resolves block ids against. A `Target`
//! is the entity scripts run against; it owns one container.

use super::errors::EngineError;
use super::types::{
    Block, BlockId, CUSTOM_BLOCK_INPUT, PROCEDURE_DEFINITION_OPCODE, PROCEDURE_PROTOTYPE_OPCODE,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Identifier of a target
pub type TargetId = String;

/// Ordered map of block id -> block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Blocks {
    blocks: IndexMap<BlockId, Block>,
}

impl Blocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a JSON object of `{ id: block }`
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert(&mut self, id: impl Into<BlockId>, block: Block) {
        self.blocks.insert(id.into(), block);
    }

    pub fn remove(&mut self, id: &str) -> Option<Block> {
        self.blocks.shift_remove(id)
    }

    pub fn get_block(&self, id: &str) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.blocks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Next block in the same sequence
    pub fn get_next_block(&self, id: &str) -> Option<BlockId> {
        self.blocks.get(id).and_then(|b| b.next.clone())
    }

    /// First block of a C-block's branch. Branch 1 is `SUBSTACK`,
    /// branch n > 1 is `SUBSTACK{n}`.
    pub fn get_branch(&self, id: &str, branch_num: usize) -> Option<BlockId> {
        let block = self.blocks.get(id)?;
        let input_name = if branch_num <= 1 {
            "SUBSTACK".to_string()
        } else {
            format!("SUBSTACK{}", branch_num)
        };
        block.inputs.get(&input_name).and_then(|i| i.block.clone())
    }

    /// Ids of top-level blocks, in declaration order
    pub fn scripts(&self) -> impl Iterator<Item = &BlockId> + '_ {
        self.blocks
            .iter()
            .filter(|(_, block)| block.top_level)
            .map(|(id, _)| id)
    }

    fn find_prototype(&self, procedure_code: &str) -> Option<&Block> {
        self.blocks.values().find(|block| {
            block.opcode.as_deref() == Some(PROCEDURE_PROTOTYPE_OPCODE)
                && block.proccode() == Some(procedure_code)
        })
    }

    /// Definition (hat) block of a procedure
    pub fn get_procedure_definition(&self, procedure_code: &str) -> Option<BlockId> {
        self.blocks
            .iter()
            .find(|(_, block)| {
                if block.opcode.as_deref() != Some(PROCEDURE_DEFINITION_OPCODE) {
                    return false;
                }
                block
                    .inputs
                    .get(CUSTOM_BLOCK_INPUT)
                    .and_then(|input| input.block.as_deref())
                    .and_then(|proto_id| self.blocks.get(proto_id))
                    .and_then(|proto| proto.proccode())
                    == Some(procedure_code)
            })
            .map(|(id, _)| id.clone())
    }

    pub fn get_procedure_param_names(&self, procedure_code: &str) -> Option<Vec<String>> {
        self.find_prototype(procedure_code)
            .and_then(|proto| proto.mutation.as_ref())
            .map(|m| m.argument_names.clone())
    }

    /// Whether the procedure is declared to run without screen refresh
    pub fn get_procedure_warp(&self, procedure_code: &str) -> bool {
        self.find_prototype(procedure_code)
            .and_then(|proto| proto.mutation.as_ref())
            .map_or(false, |m| m.warp)
    }
}

/// An entity scripts run against (a sprite or the stage)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub blocks: Blocks,
}

impl Target {
    pub fn new(id: impl Into<TargetId>, blocks: Blocks) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            blocks,
        }
    }
}

/// A loadable set of targets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub targets: Vec<Target>,
}

impl Project {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }
}
