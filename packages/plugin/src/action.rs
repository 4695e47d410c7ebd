//! Actions and the process-wide action registry.
//!
//! An [`Action`] is a named verb (`list`, `read`, `exec`, ...) bound to the
//! capability it needs and to a resolver that tells, for a natively typed
//! entry, which [`MethodSignature`] serves it. Entries wrapped in an
//! [`ExternalEntry`](crate::ExternalEntry) bypass the resolvers: their
//! declared signature table answers instead.
//!
//! The registry is built once at startup, either explicitly through
//! [`init`] or implicitly with the core actions on the first call to
//! [`registry`]. After that it is never mutated, so any number of readers
//! can share it without locking.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::{Capability, Entry, Error, Result};

/// How an entry serves an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodSignature {
    Unsupported,
    /// The action's usual contract (e.g. `read` via [`Readable`](crate::Readable)).
    Default,
    /// Random-access block reads via [`BlockReadable`](crate::BlockReadable).
    BlockAddressable,
}

impl MethodSignature {
    pub fn is_supported(&self) -> bool {
        !matches!(self, MethodSignature::Unsupported)
    }
}

/// Resolves an action's signature for a natively typed entry.
pub type SignatureResolver = fn(&dyn Entry) -> MethodSignature;

#[derive(Clone, Copy)]
pub struct Action {
    name: &'static str,
    capability: Capability,
    resolve: SignatureResolver,
}

fn default_if(supported: bool) -> MethodSignature {
    if supported {
        MethodSignature::Default
    } else {
        MethodSignature::Unsupported
    }
}

fn list_signature(entry: &dyn Entry) -> MethodSignature {
    default_if(entry.as_group().is_some())
}

fn read_signature(entry: &dyn Entry) -> MethodSignature {
    if entry.as_readable().is_some() {
        MethodSignature::Default
    } else if entry.as_block_readable().is_some() {
        MethodSignature::BlockAddressable
    } else {
        MethodSignature::Unsupported
    }
}

fn stream_signature(entry: &dyn Entry) -> MethodSignature {
    default_if(entry.as_streamable().is_some())
}

fn write_signature(entry: &dyn Entry) -> MethodSignature {
    default_if(entry.as_writable().is_some())
}

fn exec_signature(entry: &dyn Entry) -> MethodSignature {
    default_if(entry.as_execable().is_some())
}

fn delete_signature(entry: &dyn Entry) -> MethodSignature {
    default_if(entry.as_deletable().is_some())
}

fn signal_signature(entry: &dyn Entry) -> MethodSignature {
    default_if(entry.as_signalable().is_some())
}

impl Action {
    pub const LIST: Action = Action::new("list", Capability::Group, list_signature);
    pub const READ: Action = Action::new("read", Capability::Readable, read_signature);
    pub const STREAM: Action = Action::new("stream", Capability::Streamable, stream_signature);
    pub const WRITE: Action = Action::new("write", Capability::Writable, write_signature);
    pub const EXEC: Action = Action::new("exec", Capability::Execable, exec_signature);
    pub const DELETE: Action = Action::new("delete", Capability::Deletable, delete_signature);
    pub const SIGNAL: Action = Action::new("signal", Capability::Signalable, signal_signature);

    /// The actions every registry built by [`ActionRegistry::core`] holds.
    pub const CORE: [Action; 7] = [
        Action::LIST,
        Action::READ,
        Action::STREAM,
        Action::WRITE,
        Action::EXEC,
        Action::DELETE,
        Action::SIGNAL,
    ];

    pub const fn new(name: &'static str, capability: Capability, resolve: SignatureResolver) -> Self {
        Self {
            name,
            capability,
            resolve,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The contract this action needs, for documentation.
    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn signature(&self, entry: &dyn Entry) -> MethodSignature {
        match entry.as_external() {
            Some(external) => external.method_signature(self.name),
            None => (self.resolve)(entry),
        }
    }

    pub fn is_supported_on(&self, entry: &dyn Entry) -> bool {
        self.signature(entry).is_supported()
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("capability", &self.capability)
            .finish()
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.capability == other.capability
    }
}

impl Eq for Action {}

/// A fixed vocabulary of actions, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct ActionRegistry {
    actions: BTreeMap<&'static str, Action>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding [`Action::CORE`].
    pub fn core() -> Self {
        Self {
            actions: Action::CORE.iter().map(|a| (a.name, *a)).collect(),
        }
    }

    pub fn register(&mut self, action: Action) -> Result<()> {
        if self.actions.contains_key(action.name) {
            return Err(Error::DuplicateAction(action.name.to_string()));
        }
        self.actions.insert(action.name, action);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Action> {
        self.actions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// A copy of the registered actions. Mutating it doesn't touch the
    /// registry.
    pub fn actions(&self) -> BTreeMap<String, Action> {
        self.actions
            .iter()
            .map(|(name, action)| (name.to_string(), *action))
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.actions.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Names of the actions `entry` supports, in registry order.
    ///
    /// Branches on the entry variant once, then walks the registry once.
    pub fn supported_actions_of(&self, entry: &dyn Entry) -> Vec<&'static str> {
        self.resolve_all(entry)
            .filter(|(_, signature)| signature.is_supported())
            .map(|(name, _)| name)
            .collect()
    }

    /// Every supported action of `entry` with the signature serving it.
    pub fn signatures_of(&self, entry: &dyn Entry) -> BTreeMap<&'static str, MethodSignature> {
        self.resolve_all(entry)
            .filter(|(_, signature)| signature.is_supported())
            .collect()
    }

    fn resolve_all<'a>(
        &'a self,
        entry: &'a dyn Entry,
    ) -> Box<dyn Iterator<Item = (&'static str, MethodSignature)> + 'a> {
        match entry.as_external() {
            Some(external) => Box::new(
                self.actions
                    .keys()
                    .map(move |name| (*name, external.method_signature(name))),
            ),
            None => Box::new(
                self.actions
                    .values()
                    .map(move |action| (action.name, (action.resolve)(entry))),
            ),
        }
    }
}

static REGISTRY: OnceLock<ActionRegistry> = OnceLock::new();

/// Install `registry` as the process-wide registry.
///
/// Must run before the first call to [`registry`]; afterwards it fails
/// with [`Error::RegistryInitialized`].
pub fn init(registry: ActionRegistry) -> Result<&'static ActionRegistry> {
    let names: Vec<&'static str> = registry.names().collect();
    REGISTRY
        .set(registry)
        .map_err(|_| Error::RegistryInitialized)?;
    log::debug!("action registry initialized with {:?}", names);
    Ok(self::registry())
}

/// The process-wide registry, bootstrapped with the core actions if
/// [`init`] was never called.
pub fn registry() -> &'static ActionRegistry {
    REGISTRY.get_or_init(|| {
        log::debug!("bootstrapping core action registry");
        ActionRegistry::core()
    })
}

/// A copy of the process-wide registry's actions.
pub fn actions() -> BTreeMap<String, Action> {
    registry().actions()
}

pub fn supported_actions_of(entry: &dyn Entry) -> Vec<&'static str> {
    registry().supported_actions_of(entry)
}
