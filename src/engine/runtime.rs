//! Runtime state shared by every thread
//!
//! The runtime owns the targets and their block containers, the primitive and
//! hat registries, the edge-activated hat table, the IO devices and the thread
//! list. Nothing here is global: the evaluator and the capability handle reach
//! it through the `&mut Runtime` they are given.

use super::blocks::{Blocks, Project, Target, TargetId};
use super::errors::EngineError;
use super::io::IoDevice;
use super::promise::Reported;
use super::thread::{Thread, ThreadId};
use super::timer::Timer;
use super::types::{Arguments, Block, BlockId, Value};
use super::utility::BlockUtility;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// A block implementation
pub type Primitive = Rc<dyn Fn(&Arguments, &mut BlockUtility<'_>) -> Result<Reported, EngineError>>;

/// Classification of a hat opcode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HatInfo {
    /// Fires only on a false -> true transition of its predicate
    pub edge_activated: bool,
    /// Starting the hat again restarts a script that is already running
    pub restart_existing_threads: bool,
}

/// Which container a block was resolved from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockSource {
    Target(TargetId),
    /// Standalone blocks runnable outside any script (palette previews)
    Flyout,
    /// Blocks backing value monitors
    Monitor,
}

/// Something the runtime surfaces to its host
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeEvent {
    /// Transient value bubble next to a clicked block
    VisualReport { block_id: BlockId, value: Value },
    /// New textual value for a monitor
    MonitorUpdate { block_id: BlockId, value: String },
}

pub struct Runtime {
    targets: IndexMap<TargetId, Target>,
    pub flyout_blocks: Blocks,
    pub monitor_blocks: Blocks,

    primitives: HashMap<String, Primitive>,
    hats: HashMap<String, HatInfo>,
    edge_activated_values: HashMap<BlockId, Option<Value>>,
    io_devices: HashMap<String, Box<dyn IoDevice>>,

    /// Threads in start order. The scheduler steps them in place.
    pub threads: Vec<Thread>,

    events: Vec<RuntimeEvent>,
    clock: Timer,
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            targets: IndexMap::new(),
            flyout_blocks: Blocks::new(),
            monitor_blocks: Blocks::new(),
            primitives: HashMap::new(),
            hats: HashMap::new(),
            edge_activated_values: HashMap::new(),
            io_devices: HashMap::new(),
            threads: Vec::new(),
            events: Vec::new(),
            clock: Timer::start(),
        }
    }

    /* ===================== Targets and blocks ===================== */

    pub fn add_target(&mut self, target: Target) {
        self.targets.insert(target.id.clone(), target);
    }

    /// Add every target of a loaded project
    pub fn load_project(&mut self, project: Project) {
        for target in project.targets {
            self.add_target(target);
        }
    }

    /// Delete a target. Its threads notice on their next step.
    pub fn remove_target(&mut self, id: &str) -> Option<Target> {
        self.targets.shift_remove(id)
    }

    pub fn target(&self, id: &str) -> Option<&Target> {
        self.targets.get(id)
    }

    pub fn has_target(&self, id: &str) -> bool {
        self.targets.contains_key(id)
    }

    pub fn targets(&self) -> impl Iterator<Item = &Target> + '_ {
        self.targets.values()
    }

    pub fn blocks(&self, source: &BlockSource) -> Option<&Blocks> {
        match source {
            BlockSource::Target(id) => self.targets.get(id).map(|t| &t.blocks),
            BlockSource::Flyout => Some(&self.flyout_blocks),
            BlockSource::Monitor => Some(&self.monitor_blocks),
        }
    }

    /// Primary container for a thread's blocks
    pub fn primary_source(thread: &Thread) -> Option<BlockSource> {
        if thread.update_monitor {
            Some(BlockSource::Monitor)
        } else {
            thread.target.clone().map(BlockSource::Target)
        }
    }

    pub fn blocks_for_thread<'a>(&'a self, thread: &Thread) -> Option<&'a Blocks> {
        Self::primary_source(thread).and_then(|source| self.blocks(&source))
    }

    /// Resolve a block from `primary`, falling back to the flyout container
    pub fn lookup_block(&self, primary: &BlockSource, id: &str) -> Option<(BlockSource, &Block)> {
        if let Some(block) = self.blocks(primary).and_then(|b| b.get_block(id)) {
            return Some((primary.clone(), block));
        }
        self.flyout_blocks
            .get_block(id)
            .map(|block| (BlockSource::Flyout, block))
    }

    /* ===================== Registries ===================== */

    pub fn register_primitive<F>(&mut self, opcode: impl Into<String>, primitive: F)
    where
        F: Fn(&Arguments, &mut BlockUtility<'_>) -> Result<Reported, EngineError> + 'static,
    {
        self.primitives.insert(opcode.into(), Rc::new(primitive));
    }

    pub fn get_opcode_function(&self, opcode: &str) -> Option<Primitive> {
        self.primitives.get(opcode).cloned()
    }

    pub fn register_hat(&mut self, opcode: impl Into<String>, info: HatInfo) {
        self.hats.insert(opcode.into(), info);
    }

    pub fn is_hat(&self, opcode: &str) -> bool {
        self.hats.contains_key(opcode)
    }

    pub fn is_edge_activated_hat(&self, opcode: &str) -> bool {
        self.hats.get(opcode).map_or(false, |h| h.edge_activated)
    }

    /// Store the latest predicate value of an edge-activated hat, returning
    /// the previous one
    pub fn update_edge_activated_value(
        &mut self,
        block_id: &str,
        value: Option<Value>,
    ) -> Option<Value> {
        self.edge_activated_values
            .insert(block_id.to_string(), value)
            .flatten()
    }

    pub fn register_io_device(&mut self, name: impl Into<String>, device: impl IoDevice + 'static) {
        self.io_devices.insert(name.into(), Box::new(device));
    }

    /// Call `function` on `device`. Unknown devices or functions answer
    /// nothing.
    pub fn io_query(&mut self, device: &str, function: &str, args: &[Value]) -> Option<Value> {
        let device = self.io_devices.get_mut(device)?;
        if !device.has_function(function) {
            return None;
        }
        device.call(function, args)
    }

    /* ===================== Threads ===================== */

    /// Create a thread for `top_block`, primed with its first frame
    pub fn push_thread(&mut self, top_block: impl Into<BlockId>, target: Option<TargetId>) -> ThreadId {
        let top_block = top_block.into();
        let mut thread = Thread::new(top_block.clone());
        thread.target = target;
        thread.push_stack(top_block);
        let id = thread.id;
        self.threads.push(thread);
        id
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn thread(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == id)
    }

    pub fn thread_mut(&mut self, id: ThreadId) -> Option<&mut Thread> {
        self.threads.iter_mut().find(|t| t.id == id)
    }

    /// Toggle a script the user clicked: stop it if it is running, else
    /// start it as a click run (hat edge checks bypassed, values surfaced).
    ///
    /// Returns the started thread, or `None` when a run was stopped.
    pub fn click_script(
        &mut self,
        top_block: impl Into<BlockId>,
        target: &str,
    ) -> Result<Option<ThreadId>, EngineError> {
        if !self.has_target(target) {
            return Err(EngineError::UnknownTarget(target.to_string()));
        }
        let top_block = top_block.into();

        let running = self.threads.iter_mut().find(|thread| {
            !thread.status.is_done()
                && thread.top_block() == Some(&top_block)
                && thread.target.as_deref() == Some(target)
        });
        if let Some(thread) = running {
            debug!(thread_id = %thread.id, block_id = %top_block, "Stopping clicked script");
            thread.retire();
            return Ok(None);
        }

        let id = self.push_thread(top_block, Some(target.to_string()));
        if let Some(thread) = self.thread_mut(id) {
            thread.stack_click = true;
        }
        Ok(Some(id))
    }

    /// Start threads for every script topped by the `opcode` hat.
    ///
    /// `match_fields` restricts to hats whose fields equal the given values,
    /// compared case-insensitively; `target` restricts to one target.
    pub fn start_hats(
        &mut self,
        opcode: &str,
        match_fields: Option<&HashMap<String, String>>,
        target: Option<&str>,
    ) -> Vec<ThreadId> {
        let Some(info) = self.hat_info(opcode) else {
            return Vec::new();
        };
        let scripts = self.hat_scripts(opcode, match_fields, target);
        self.start_scripts(info, scripts)
    }

    pub fn hat_info(&self, opcode: &str) -> Option<HatInfo> {
        self.hats.get(opcode).copied()
    }

    /// Scripts (target, top block) topped by an `opcode` hat that passes the
    /// field and target filters
    pub(crate) fn hat_scripts(
        &self,
        opcode: &str,
        match_fields: Option<&HashMap<String, String>>,
        target: Option<&str>,
    ) -> Vec<(TargetId, BlockId)> {
        let mut scripts: Vec<(TargetId, BlockId)> = Vec::new();
        for t in self.targets.values() {
            if target.map_or(false, |wanted| wanted != t.id) {
                continue;
            }
            for top in t.blocks.scripts() {
                let Some(block) = t.blocks.get_block(top) else {
                    continue;
                };
                if block.opcode.as_deref() != Some(opcode) {
                    continue;
                }
                let fields_match = match_fields.map_or(true, |wanted| {
                    wanted.iter().all(|(name, value)| {
                        block
                            .fields
                            .get(name)
                            .map_or(false, |f| f.value.to_string().eq_ignore_ascii_case(value))
                    })
                });
                if fields_match {
                    scripts.push((t.id.clone(), top.clone()));
                }
            }
        }
        scripts
    }

    /// Start, restart or skip a thread for each script
    pub(crate) fn start_scripts(&mut self, info: HatInfo, scripts: Vec<(TargetId, BlockId)>) -> Vec<ThreadId> {
        let mut started = Vec::new();
        for (target_id, top) in scripts {
            let existing = self.threads.iter_mut().find(|thread| {
                !thread.status.is_done()
                    && thread.top_block() == Some(&top)
                    && thread.target.as_deref() == Some(target_id.as_str())
            });
            match existing {
                Some(thread) if info.restart_existing_threads => {
                    debug!(thread_id = %thread.id, block_id = %top, "Restarting thread");
                    thread.restart();
                    started.push(thread.id);
                }
                Some(_) => {}
                None => started.push(self.push_thread(top, Some(target_id))),
            }
        }
        started
    }

    /// Evaluate every edge-activated hat once more
    pub fn start_edge_activated_hats(&mut self) -> Vec<ThreadId> {
        let opcodes: Vec<String> = self
            .hats
            .iter()
            .filter(|(_, info)| info.edge_activated)
            .map(|(opcode, _)| opcode.clone())
            .collect();

        opcodes
            .iter()
            .flat_map(|opcode| self.start_hats(opcode, None, None))
            .collect()
    }

    /// Retire every listed thread
    pub fn stop_all(&mut self) {
        debug!(count = self.threads.len(), "Stopping all threads");
        for thread in &mut self.threads {
            thread.retire();
        }
    }

    /// Retire the listed threads running on `target`, except `except`
    pub fn stop_for_target(&mut self, target: &str, except: Option<ThreadId>) {
        for thread in &mut self.threads {
            if thread.target.as_deref() == Some(target) && Some(thread.id) != except {
                thread.retire();
            }
        }
    }

    /* ===================== Surfacing ===================== */

    pub fn visual_report(&mut self, block_id: &str, value: Value) {
        self.events.push(RuntimeEvent::VisualReport {
            block_id: block_id.to_string(),
            value,
        });
    }

    pub fn request_update_monitor(&mut self, block_id: &str, value: String) {
        self.events.push(RuntimeEvent::MonitorUpdate {
            block_id: block_id.to_string(),
            value,
        });
    }

    /// Drain surfaced events
    pub fn take_events(&mut self) -> Vec<RuntimeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Milliseconds since the runtime was created
    pub fn current_msecs(&self) -> f64 {
        self.clock.elapsed_ms()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
