use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tinsel_core::{CoreError, Edge, InputMode, KeyCode, MouseButton};

use crate::bus::Firing;
use crate::context::TaskContext;
use crate::error::{BehaviorResult, RegistrationError};
use crate::routine::{Idle, Routine, RoutineFactory, factory};

/// Body of a one-shot behavior. Runs to completion on every firing.
pub type HandlerFn = Rc<dyn Fn(&mut TaskContext<'_>, &Firing) -> BehaviorResult<()>>;

/// What makes a behavior run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Started once when a non-clone entity enters the scene.
    Main,
    /// Started once for each clone of the type.
    Clone,
    /// A broadcast with this name.
    Broadcast(String),
    /// A keyboard key.
    Key {
        /// The key.
        code: KeyCode,
        /// When to fire.
        mode: InputMode,
    },
    /// A pointer button.
    Mouse {
        /// The button.
        button: MouseButton,
        /// When to fire.
        mode: InputMode,
    },
    /// Contact with a side of the stage.
    EdgeCollision(Edge),
    /// Contact with any live entity carrying this name.
    SpriteCollision(String),
    /// Contact with any live entity of this type.
    SpriteCollisionType(String),
}

impl Trigger {
    /// MAIN and CLONE behaviors are resumable; everything else is one-shot.
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Main | Self::Clone)
    }

    /// True if a handler declared with this trigger should run for `firing`.
    pub fn matches(&self, firing: &Firing) -> bool {
        match (self, firing) {
            (Self::Broadcast(name), Firing::Broadcast(fired)) => name == fired,
            (Self::Key { code, mode }, Firing::Key { code: c, mode: m }) => code == c && mode == m,
            (
                Self::Mouse { button, mode },
                Firing::Mouse {
                    button: b,
                    mode: m,
                },
            ) => button == b && mode == m,
            (Self::EdgeCollision(edge), Firing::Edge(touched)) => edge.matches(*touched),
            (Self::SpriteCollision(name), Firing::Contact { other_name, .. }) => name == other_name,
            (Self::SpriteCollisionType(type_name), Firing::Contact { other_type, .. }) => {
                type_name == other_type
            }
            _ => false,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Clone => "clone",
            Self::Broadcast(_) => "broadcast",
            Self::Key { .. } => "key",
            Self::Mouse { .. } => "mouse",
            Self::EdgeCollision(_) => "edge",
            Self::SpriteCollision(_) => "touching",
            Self::SpriteCollisionType(_) => "touching_type",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main | Self::Clone => write!(f, "{}", self.kind()),
            Self::Broadcast(name)
            | Self::SpriteCollision(name)
            | Self::SpriteCollisionType(name) => write!(f, "{}(\"{name}\")", self.kind()),
            Self::Key { code, mode } => write!(f, "key({code}, {mode})"),
            Self::Mouse { button, mode } => write!(f, "mouse({button}, {mode})"),
            Self::EdgeCollision(edge) => write!(f, "edge({edge})"),
        }
    }
}

/// Entry point of a declaration.
#[derive(Clone)]
pub enum Entry {
    /// Factory for a resumable routine (MAIN, CLONE).
    Routine(RoutineFactory),
    /// Run-to-completion handler (everything else).
    Handler(HandlerFn),
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Routine(_) => write!(f, "Routine(..)"),
            Self::Handler(_) => write!(f, "Handler(..)"),
        }
    }
}

impl Entry {
    /// Wrap a typed routine factory.
    pub fn routine<F, R>(make: F) -> Self
    where
        F: Fn() -> R + 'static,
        R: Routine + 'static,
    {
        Self::Routine(factory(make))
    }

    /// Wrap a handler closure.
    pub fn handler<H>(handler: H) -> Self
    where
        H: Fn(&mut TaskContext<'_>, &Firing) -> BehaviorResult<()> + 'static,
    {
        Self::Handler(Rc::new(handler))
    }
}

/// One declared behavior: a trigger and its entry point.
#[derive(Debug, Clone)]
pub struct BehaviorDecl {
    /// When it runs.
    pub trigger: Trigger,
    /// What runs.
    pub entry: Entry,
}

/// The static, per-type list of behavior declarations.
///
/// Built once through [`BehaviorTable::builder`] and never mutated; tasks
/// are instantiated from it whenever an entity of the type goes live.
#[derive(Debug, Clone)]
pub struct BehaviorTable {
    type_name: String,
    decls: Vec<BehaviorDecl>,
}

impl BehaviorTable {
    /// Start declaring behaviors for `type_name`.
    pub fn builder(type_name: impl Into<String>) -> BehaviorTableBuilder {
        BehaviorTableBuilder {
            type_name: type_name.into(),
            decls: Vec::new(),
            has_main: false,
            error: None,
        }
    }

    /// The entity type this table drives.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// All declarations, in declaration order.
    pub fn declarations(&self) -> &[BehaviorDecl] {
        &self.decls
    }

    /// Number of declarations, including an implicit idle MAIN.
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    /// Always false for a built table, which holds at least a MAIN.
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Number of CLONE declarations.
    pub fn clone_routines(&self) -> usize {
        self.decls
            .iter()
            .filter(|d| d.trigger == Trigger::Clone)
            .count()
    }

    /// Number of one-shot handler declarations.
    pub fn handlers(&self) -> usize {
        self.decls
            .iter()
            .filter(|d| !d.trigger.is_persistent())
            .count()
    }
}

/// Collects declarations for a [`BehaviorTable`].
///
/// The first invalid declaration is remembered and reported by
/// [`build`](Self::build); later calls are ignored once an error is recorded.
#[derive(Debug)]
pub struct BehaviorTableBuilder {
    type_name: String,
    decls: Vec<BehaviorDecl>,
    has_main: bool,
    error: Option<RegistrationError>,
}

impl BehaviorTableBuilder {
    /// Declare the MAIN routine.
    pub fn main<F, R>(self, make: F) -> Self
    where
        F: Fn() -> R + 'static,
        R: Routine + 'static,
    {
        self.declare(Trigger::Main, Entry::routine(make))
    }

    /// Declare a CLONE routine, started fresh in every clone.
    pub fn on_clone<F, R>(self, make: F) -> Self
    where
        F: Fn() -> R + 'static,
        R: Routine + 'static,
    {
        self.declare(Trigger::Clone, Entry::routine(make))
    }

    /// Declare a broadcast handler.
    pub fn on_broadcast<H>(self, name: impl Into<String>, handler: H) -> Self
    where
        H: Fn(&mut TaskContext<'_>, &Firing) -> BehaviorResult<()> + 'static,
    {
        self.declare(Trigger::Broadcast(name.into()), Entry::handler(handler))
    }

    /// Declare a key handler; `mode` is `pressed`, `held` or `released`.
    pub fn on_key<H>(self, code: KeyCode, mode: &str, handler: H) -> Self
    where
        H: Fn(&mut TaskContext<'_>, &Firing) -> BehaviorResult<()> + 'static,
    {
        match mode.parse::<InputMode>() {
            Ok(mode) => self.on_key_mode(code, mode, handler),
            Err(err) => self.fail_parse(err),
        }
    }

    /// Declare a key handler with an already parsed mode.
    pub fn on_key_mode<H>(self, code: KeyCode, mode: InputMode, handler: H) -> Self
    where
        H: Fn(&mut TaskContext<'_>, &Firing) -> BehaviorResult<()> + 'static,
    {
        self.declare(Trigger::Key { code, mode }, Entry::handler(handler))
    }

    /// Declare a pointer button handler; `mode` is `pressed`, `held` or `released`.
    pub fn on_mouse<H>(self, button: MouseButton, mode: &str, handler: H) -> Self
    where
        H: Fn(&mut TaskContext<'_>, &Firing) -> BehaviorResult<()> + 'static,
    {
        match mode.parse::<InputMode>() {
            Ok(mode) => self.declare(Trigger::Mouse { button, mode }, Entry::handler(handler)),
            Err(err) => self.fail_parse(err),
        }
    }

    /// Declare an edge handler; `edge` is `any`, `left`, `right`, `top` or `bottom`.
    pub fn on_edge<H>(self, edge: &str, handler: H) -> Self
    where
        H: Fn(&mut TaskContext<'_>, &Firing) -> BehaviorResult<()> + 'static,
    {
        match edge.parse::<Edge>() {
            Ok(edge) => self.declare(Trigger::EdgeCollision(edge), Entry::handler(handler)),
            Err(err) => self.fail_parse(err),
        }
    }

    /// Declare a handler for contact with entities named `name`.
    pub fn on_sprite_collision<H>(self, name: impl Into<String>, handler: H) -> Self
    where
        H: Fn(&mut TaskContext<'_>, &Firing) -> BehaviorResult<()> + 'static,
    {
        self.declare(Trigger::SpriteCollision(name.into()), Entry::handler(handler))
    }

    /// Declare a handler for contact with any entity of type `type_name`.
    pub fn on_sprite_collision_type<H>(self, type_name: impl Into<String>, handler: H) -> Self
    where
        H: Fn(&mut TaskContext<'_>, &Firing) -> BehaviorResult<()> + 'static,
    {
        self.declare(
            Trigger::SpriteCollisionType(type_name.into()),
            Entry::handler(handler),
        )
    }

    /// Declare a behavior from its parts, checking that the entry kind fits the trigger.
    pub fn declare(mut self, trigger: Trigger, entry: Entry) -> Self {
        if self.error.is_some() {
            return self;
        }
        if let Err(err) = self.validate(&trigger, &entry) {
            self.error = Some(err);
            return self;
        }
        if trigger == Trigger::Main {
            self.has_main = true;
        }
        self.decls.push(BehaviorDecl { trigger, entry });
        self
    }

    /// Finish the table, or report the first invalid declaration.
    ///
    /// A table without a MAIN gets an idle one that finishes on its first resumption.
    pub fn build(mut self) -> Result<BehaviorTable, RegistrationError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if !self.has_main {
            self.decls.insert(
                0,
                BehaviorDecl {
                    trigger: Trigger::Main,
                    entry: Entry::routine(|| Idle),
                },
            );
        }
        Ok(BehaviorTable {
            type_name: self.type_name,
            decls: self.decls,
        })
    }

    fn validate(&self, trigger: &Trigger, entry: &Entry) -> Result<(), RegistrationError> {
        if *trigger == Trigger::Main && self.has_main {
            return Err(RegistrationError::DuplicateMain(self.type_name.clone()));
        }
        match trigger {
            Trigger::Broadcast(name)
            | Trigger::SpriteCollision(name)
            | Trigger::SpriteCollisionType(name)
                if name.is_empty() =>
            {
                return Err(RegistrationError::EmptyName {
                    type_name: self.type_name.clone(),
                    trigger: trigger.kind(),
                });
            }
            _ => {}
        }
        let expected = match (trigger.is_persistent(), entry) {
            (true, Entry::Handler(_)) => Some("routine"),
            (false, Entry::Routine(_)) => Some("handler"),
            _ => None,
        };
        match expected {
            Some(expected) => Err(RegistrationError::EntryMismatch {
                type_name: self.type_name.clone(),
                trigger: trigger.to_string(),
                expected,
            }),
            None => Ok(()),
        }
    }

    fn fail_parse(mut self, source: CoreError) -> Self {
        if self.error.is_none() {
            self.error = Some(RegistrationError::InvalidTrigger {
                type_name: self.type_name.clone(),
                source,
            });
        }
        self
    }
}

/// All registered behavior tables, keyed by type name.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    tables: HashMap<String, Rc<BehaviorTable>>,
}

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table. Each type name may be registered once.
    pub fn register(&mut self, table: BehaviorTable) -> Result<(), RegistrationError> {
        if self.tables.contains_key(table.type_name()) {
            return Err(RegistrationError::DuplicateType(table.type_name.clone()));
        }
        self.tables
            .insert(table.type_name.clone(), Rc::new(table));
        Ok(())
    }

    /// Look up a table.
    pub fn get(&self, type_name: &str) -> Option<&Rc<BehaviorTable>> {
        self.tables.get(type_name)
    }

    /// True if `type_name` is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.tables.contains_key(type_name)
    }

    /// Registered type names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
