use std::fmt;

use tinsel_core::EntityId;

use crate::behavior::{HandlerFn, Trigger};
use crate::routine::Routine;

/// Identifier of a task. Allocated in creation order, which is also resume order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Instantiated, never run.
    Created,
    /// Waiting: for its wake time (persistent) or its next firing (one-shot).
    Suspended,
    /// Currently executing.
    Ready,
    /// Finished normally. Never restarted.
    Done,
    /// Stopped by an error, an owner removal, or a scene switch.
    Cancelled,
}

impl TaskState {
    /// True for `Done` and `Cancelled`.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }

    /// True for states from which the task may still run.
    pub fn is_armed(self) -> bool {
        matches!(self, Self::Created | Self::Suspended)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Suspended => write!(f, "suspended"),
            Self::Ready => write!(f, "ready"),
            Self::Done => write!(f, "done"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

pub(crate) enum TaskBody {
    Routine(Box<dyn Routine>),
    Handler(HandlerFn),
}

/// A resumable or re-fireable execution unit owned by one entity.
///
/// The owner is held by id only; the registry resolves it on every run.
pub struct Task {
    pub(crate) id: TaskId,
    pub(crate) entity: EntityId,
    pub(crate) trigger: Trigger,
    pub(crate) state: TaskState,
    pub(crate) wake_at: u64,
    pub(crate) body: TaskBody,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("entity", &self.entity)
            .field("trigger", &self.trigger)
            .field("state", &self.state)
            .field("wake_at", &self.wake_at)
            .finish()
    }
}

impl Task {
    /// This task's id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The owning entity.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// The trigger it was declared with.
    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Earliest time a persistent task may resume.
    pub fn wake_at(&self) -> u64 {
        self.wake_at
    }

    /// True for MAIN and CLONE tasks.
    pub fn is_persistent(&self) -> bool {
        self.trigger.is_persistent()
    }

    /// True if a persistent task should be resumed at `now`.
    pub(crate) fn is_due(&self, now: u64) -> bool {
        self.is_persistent() && self.state.is_armed() && self.wake_at <= now
    }
}

/// All instantiated tasks in creation order.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: Vec<Task>,
    next_id: u64,
}

impl TaskQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(
        &mut self,
        entity: EntityId,
        trigger: Trigger,
        body: TaskBody,
        now: u64,
    ) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(Task {
            id,
            entity,
            trigger,
            state: TaskState::Created,
            wake_at: now,
            body,
        });
        id
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Task> {
        self.tasks.get_mut(index)
    }

    /// Task at a queue position.
    pub fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    /// Tasks in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Tasks owned by `entity`, in creation order.
    pub fn for_entity(&self, entity: EntityId) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.entity == entity)
    }

    /// Cancel every unfinished task owned by `entity`. Returns how many were cancelled.
    pub(crate) fn cancel_entity(&mut self, entity: EntityId) -> usize {
        let mut cancelled = 0;
        for task in self.tasks.iter_mut().filter(|t| t.entity == entity) {
            if !task.state.is_finished() {
                task.state = TaskState::Cancelled;
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Cancel every unfinished task.
    pub(crate) fn cancel_all(&mut self) -> usize {
        let mut cancelled = 0;
        for task in &mut self.tasks {
            if !task.state.is_finished() {
                task.state = TaskState::Cancelled;
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Drop finished tasks, keeping the order of the rest.
    pub(crate) fn purge(&mut self) {
        self.tasks.retain(|t| !t.state.is_finished());
    }

    /// Number of tasks, finished ones included until the next purge.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True if there are no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routine::Idle;

    fn main_task(queue: &mut TaskQueue, entity: u64, now: u64) -> TaskId {
        queue.push(
            EntityId(entity),
            Trigger::Main,
            TaskBody::Routine(Box::new(Idle)),
            now,
        )
    }

    #[test]
    fn ids_follow_creation_order() {
        let mut queue = TaskQueue::new();
        let a = main_task(&mut queue, 1, 0);
        let b = main_task(&mut queue, 2, 0);
        assert!(a < b);
        assert_eq!(a.to_string(), "task#0");
        let order: Vec<TaskId> = queue.iter().map(Task::id).collect();
        assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn due_only_when_armed_and_awake() {
        let mut queue = TaskQueue::new();
        main_task(&mut queue, 1, 100);
        let task = queue.get(0).unwrap();
        assert!(!task.is_due(99));
        assert!(task.is_due(100));

        queue.get_mut(0).unwrap().state = TaskState::Done;
        assert!(!queue.get(0).unwrap().is_due(500));
    }

    #[test]
    fn cancel_entity_then_purge() {
        let mut queue = TaskQueue::new();
        main_task(&mut queue, 1, 0);
        main_task(&mut queue, 2, 0);
        main_task(&mut queue, 1, 0);

        assert_eq!(queue.cancel_entity(EntityId(1)), 2);
        assert_eq!(queue.cancel_entity(EntityId(1)), 0);
        queue.purge();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get(0).unwrap().entity(), EntityId(2));
    }
}
