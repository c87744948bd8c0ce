//! Render runtime: layout state plus a single-consumer task queue
//!
//! Everything runs on one thread. `enqueue` appends a task and, unless a
//! drain loop is already running further up the stack, drains the queue
//! immediately. Tasks submitted from inside a running task are appended and
//! picked up by that same loop once the current task returns, so tasks never
//! overlap and always run in submission order.
//!
//! A failing task is logged and reported through its handle; the queue
//! carries on with the next task.

use super::errors::RenderError;
use super::fonts::FontChoice;
use super::layout::{ContainerMetrics, Dimensions, StaffSizing};
use crate::models::{Clef, KeySignature, Meter, Voice};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

// ============================================================================
// State
// ============================================================================

/// Note the pointer layer wants selected after the next render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSelection {
    pub voice_index: usize,
    pub note_index: usize,
}

/// Mutable layout state owned by a `RenderRuntime`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderState {
    pub voices: Vec<Voice>,
    pub meter: Meter,
    pub key_sig: KeySignature,
    pub primary_clef: Clef,
    pub staff_scale: Option<f64>,
    pub staff_scale_y: Option<f64>,
    pub staff_pack: Option<f64>,
    pub sizing: StaffSizing,
    pub container: ContainerMetrics,
    pub pending_selection: Option<PendingSelection>,
    pub warnings: Vec<String>,
    pub interaction_enabled: bool,
    pub base_message: Option<String>,
    pub font_choice: Option<FontChoice>,
    pub computed_width: Option<f64>,
    pub computed_height: Option<f64>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            voices: Vec::new(),
            meter: Meter::default(),
            key_sig: KeySignature::default(),
            primary_clef: Clef::default(),
            staff_scale: None,
            staff_scale_y: None,
            staff_pack: None,
            sizing: StaffSizing::defaults(),
            container: ContainerMetrics::default(),
            pending_selection: None,
            warnings: Vec::new(),
            interaction_enabled: false,
            base_message: None,
            font_choice: None,
            computed_width: None,
            computed_height: None,
        }
    }
}

/// Shallow partial update; `None` fields are left alone
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderStateUpdate {
    pub meter: Option<Meter>,
    pub key_sig: Option<KeySignature>,
    pub primary_clef: Option<Clef>,
    pub staff_scale: Option<f64>,
    pub staff_scale_y: Option<f64>,
    pub staff_pack: Option<f64>,
    pub sizing: Option<StaffSizing>,
    pub container: Option<ContainerMetrics>,
    pub pending_selection: Option<Option<PendingSelection>>,
    pub warnings: Option<Vec<String>>,
    pub interaction_enabled: Option<bool>,
}

impl RenderState {
    pub fn apply(&mut self, update: RenderStateUpdate) {
        if let Some(meter) = update.meter {
            self.meter = meter.sanitized();
        }
        if let Some(key_sig) = update.key_sig {
            self.key_sig = key_sig;
        }
        if let Some(clef) = update.primary_clef {
            self.primary_clef = clef;
        }
        if update.staff_scale.is_some() {
            self.staff_scale = update.staff_scale;
        }
        if update.staff_scale_y.is_some() {
            self.staff_scale_y = update.staff_scale_y;
        }
        if update.staff_pack.is_some() {
            self.staff_pack = update.staff_pack;
        }
        if let Some(sizing) = update.sizing {
            self.sizing = sizing.normalized();
        }
        if let Some(container) = update.container {
            self.container = container;
        }
        if let Some(selection) = update.pending_selection {
            self.pending_selection = selection;
        }
        if let Some(warnings) = update.warnings {
            self.warnings = warnings;
        }
        if let Some(enabled) = update.interaction_enabled {
            self.interaction_enabled = enabled;
        }
    }

    /// Dimensions computed by the last successful layout, if any
    pub fn computed_size(&self) -> Option<(f64, f64)> {
        self.computed_width.zip(self.computed_height)
    }
}

/// De-duplicate warnings, keeping first occurrences and dropping blanks
pub fn dedupe_warnings<I, S>(warnings: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut unique: Vec<String> = Vec::new();
    for warning in warnings {
        let warning = warning.into();
        if warning.trim().is_empty() || unique.contains(&warning) {
            continue;
        }
        unique.push(warning);
    }
    unique
}

// ============================================================================
// Tasks and handles
// ============================================================================

/// Summary of a completed render pass
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderReport {
    pub voice_count: usize,
    pub note_count: usize,
    pub dimensions: Option<Dimensions>,
    pub warnings: Vec<String>,
    pub base_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Pending,
    Rendered(RenderReport),
    /// The task ran (or was short-circuited) without drawing
    Skipped,
    Failed(String),
}

impl TaskOutcome {
    pub fn is_settled(&self) -> bool {
        !matches!(self, TaskOutcome::Pending)
    }
}

/// Completion handle for an enqueued task
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: u64,
    slot: Rc<RefCell<TaskOutcome>>,
}

impl TaskHandle {
    fn new(id: u64, outcome: TaskOutcome) -> Self {
        Self {
            id,
            slot: Rc::new(RefCell::new(outcome)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn outcome(&self) -> TaskOutcome {
        self.slot.borrow().clone()
    }

    pub fn is_settled(&self) -> bool {
        self.slot.borrow().is_settled()
    }

    /// Report of a rendered task, if it rendered
    pub fn report(&self) -> Option<RenderReport> {
        match &*self.slot.borrow() {
            TaskOutcome::Rendered(report) => Some(report.clone()),
            _ => None,
        }
    }

    fn settle(&self, outcome: TaskOutcome) {
        *self.slot.borrow_mut() = outcome;
    }
}

pub type TaskResult = Result<Option<RenderReport>, RenderError>;
pub type RenderTask = Box<dyn FnOnce(&mut RenderState) -> TaskResult>;
pub type ErrorHook = Rc<dyn Fn(&RenderError)>;

struct QueuedTask {
    label: &'static str,
    task: RenderTask,
    handle: TaskHandle,
}

// ============================================================================
// Runtime
// ============================================================================

pub struct RenderRuntime {
    state: RefCell<RenderState>,
    queue: RefCell<VecDeque<QueuedTask>>,
    deferred_updates: RefCell<Vec<RenderStateUpdate>>,
    draining: Cell<bool>,
    next_id: Cell<u64>,
    on_error: RefCell<Option<ErrorHook>>,
}

/// Clears the draining flag however the drain loop exits
struct DrainGuard<'a>(&'a Cell<bool>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Default for RenderRuntime {
    fn default() -> Self {
        Self::new(RenderState::default())
    }
}

impl RenderRuntime {
    pub fn new(initial: RenderState) -> Self {
        Self {
            state: RefCell::new(initial),
            queue: RefCell::new(VecDeque::new()),
            deferred_updates: RefCell::new(Vec::new()),
            draining: Cell::new(false),
            next_id: Cell::new(1),
            on_error: RefCell::new(None),
        }
    }

    /// Called with every task failure, after it has been logged
    pub fn set_error_hook(&self, hook: impl Fn(&RenderError) + 'static) {
        *self.on_error.borrow_mut() = Some(Rc::new(hook));
    }

    fn allocate_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Handle that is already settled, for calls that need no render
    pub fn settled(&self, outcome: TaskOutcome) -> TaskHandle {
        TaskHandle::new(self.allocate_id(), outcome)
    }

    /// Append a task; it runs after every task submitted before it
    pub fn enqueue<F>(&self, label: &'static str, task: F) -> TaskHandle
    where
        F: FnOnce(&mut RenderState) -> TaskResult + 'static,
    {
        let handle = TaskHandle::new(self.allocate_id(), TaskOutcome::Pending);
        self.queue.borrow_mut().push_back(QueuedTask {
            label,
            task: Box::new(task),
            handle: handle.clone(),
        });

        if !self.draining.get() {
            self.drain();
        } else {
            log::debug!(
                "[RenderRuntime] queued '{}' (#{}) behind running task",
                label,
                handle.id()
            );
        }
        handle
    }

    fn drain(&self) {
        self.draining.set(true);
        let _guard = DrainGuard(&self.draining);

        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(QueuedTask { label, task, handle }) = next else {
                break;
            };

            let result = {
                let mut state = self.state.borrow_mut();
                task(&mut state)
            };
            self.flush_deferred();

            match result {
                Ok(Some(report)) => handle.settle(TaskOutcome::Rendered(report)),
                Ok(None) => handle.settle(TaskOutcome::Skipped),
                Err(err) => {
                    log::error!("[RenderRuntime] task '{}' (#{}) failed: {}", label, handle.id(), err);
                    // The hook may re-enter the runtime, so no borrow is held across the call.
                    let hook = self.on_error.borrow().clone();
                    if let Some(hook) = hook {
                        hook(&err);
                    }
                    handle.settle(TaskOutcome::Failed(err.to_string()));
                }
            }
        }
    }

    fn flush_deferred(&self) {
        let updates: Vec<RenderStateUpdate> = self.deferred_updates.borrow_mut().drain(..).collect();
        if updates.is_empty() {
            return;
        }
        let mut state = self.state.borrow_mut();
        for update in updates {
            state.apply(update);
        }
    }

    /// Shallow-merge into state without queueing
    ///
    /// If a task currently holds the state, the merge is applied as soon as
    /// that task returns.
    pub fn update(&self, update: RenderStateUpdate) {
        match self.state.try_borrow_mut() {
            Ok(mut state) => state.apply(update),
            Err(_) => {
                log::debug!("[RenderRuntime] state busy; deferring update");
                self.deferred_updates.borrow_mut().push(update);
            }
        }
    }

    /// Replace the warning set with a de-duplicated copy of `warnings`
    pub fn record_warnings<I, S>(&self, warnings: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update(RenderStateUpdate {
            warnings: Some(dedupe_warnings(warnings)),
            ..RenderStateUpdate::default()
        });
    }

    pub fn set_pending_selection(&self, selection: Option<PendingSelection>) {
        self.update(RenderStateUpdate {
            pending_selection: Some(selection),
            ..RenderStateUpdate::default()
        });
    }

    /// Copy of the current state; unavailable while a task holds it
    pub fn snapshot(&self) -> Result<RenderState, RenderError> {
        self.state
            .try_borrow()
            .map(|state| state.clone())
            .map_err(|_| RenderError::StateUnavailable("a render task is running".to_string()))
    }

    /// Tasks waiting behind the running one
    pub fn pending_tasks(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_draining(&self) -> bool {
        self.draining.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_warnings() {
        assert_eq!(
            dedupe_warnings(["a", "", "b", "a", "  "]),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_apply_sanitizes() {
        let mut state = RenderState::default();
        state.apply(RenderStateUpdate {
            meter: Some(Meter { num: 0, den: 0 }),
            sizing: Some(StaffSizing {
                min_width: Some(500.0),
                max_width: Some(100.0),
                ..StaffSizing::default()
            }),
            ..RenderStateUpdate::default()
        });
        assert_eq!(state.meter, Meter::default());
        assert_eq!(state.sizing.max_width, None);
    }

    #[test]
    fn test_settled_handle() {
        let runtime = RenderRuntime::default();
        let handle = runtime.settled(TaskOutcome::Skipped);
        assert!(handle.is_settled());
        assert_eq!(handle.outcome(), TaskOutcome::Skipped);
        assert_eq!(runtime.pending_tasks(), 0);
    }

    #[test]
    fn test_snapshot_unavailable_inside_task() {
        let runtime = Rc::new(RenderRuntime::default());
        let inner = runtime.clone();
        let seen = Rc::new(Cell::new(false));
        let seen_in_task = seen.clone();
        runtime.enqueue("inspect", move |_state| {
            seen_in_task.set(inner.snapshot().is_err());
            Ok(None)
        });
        assert!(seen.get());
        assert!(runtime.snapshot().is_ok());
    }
}
