//! Command registry.
//!
//! This module contains the [`CommandHandler`] trait, the explicit
//! registration API ([`CommandSpec`] / [`CommandContainer`]) and the
//! [`CommandRegistry`] that maps canonical command names to descriptors.
//!
//! Command names are normalized to ASCII uppercase at registration time and
//! resolved case-insensitively, exact match only. The registry is mutated only
//! while the listener is not yet serving; during serving it is shared behind
//! an `Arc` and read without locking.

use crate::error::{DispatchError, HelpError, RegistrationError};
use crate::help::HelpCatalog;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Trait implemented by all command handlers.
///
/// Arguments arrive as already-tokenized strings; type coercion beyond
/// strings is the handler's own responsibility. A handler may return a value
/// (written back to the client) or `None` for commands with no result.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Execute the command with the given positional arguments.
    async fn call(&self, args: &[String]) -> anyhow::Result<Option<String>>;
}

/// Adapter wrapping a plain synchronous closure as a [`CommandHandler`].
struct FnHandler<F>(F);

#[async_trait]
impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&[String]) -> anyhow::Result<Option<String>> + Send + Sync,
{
    async fn call(&self, args: &[String]) -> anyhow::Result<Option<String>> {
        (self.0)(args)
    }
}

/// One command as declared by a container: the explicit
/// (name, arity, handler, help-entries) registration record.
pub struct CommandSpec {
    name: String,
    arity: usize,
    handler: Arc<dyn CommandHandler>,
    help: Vec<(String, String)>,
}

impl CommandSpec {
    /// Declare a command backed by a [`CommandHandler`] implementation.
    pub fn new(
        name: impl Into<String>,
        arity: usize,
        handler: Arc<dyn CommandHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            handler,
            help: Vec::new(),
        }
    }

    /// Declare a command backed by a synchronous closure.
    pub fn from_fn<F>(name: impl Into<String>, arity: usize, f: F) -> Self
    where
        F: Fn(&[String]) -> anyhow::Result<Option<String>> + Send + Sync + 'static,
    {
        Self::new(name, arity, Arc::new(FnHandler(f)))
    }

    /// Attach help text for the default culture.
    pub fn help(self, text: impl Into<String>) -> Self {
        self.help_for("", text)
    }

    /// Attach help text for a specific culture identifier.
    pub fn help_for(mut self, culture: impl Into<String>, text: impl Into<String>) -> Self {
        self.help.push((culture.into(), text.into()));
        self
    }

    /// Declared command name as written by the container (not yet normalized).
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A user-defined group of commands registered as one unit.
///
/// The explicit replacement for reflection-based discovery: the container
/// states its identity and lists its commands as [`CommandSpec`] values.
pub trait CommandContainer {
    /// Container identity, used to reject double registration.
    fn name(&self) -> &str;

    /// The commands this container contributes.
    fn commands(&self) -> Vec<CommandSpec>;
}

/// Registry record binding a canonical command name to its handler and help.
pub struct CommandDescriptor {
    name: String,
    arity: usize,
    container: String,
    handler: Arc<dyn CommandHandler>,
    help: HelpCatalog,
}

impl CommandDescriptor {
    /// Canonical (uppercase) command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared positional parameter count.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Name of the container that declared this command.
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Per-culture help catalog.
    pub fn help(&self) -> &HelpCatalog {
        &self.help
    }

    pub(crate) fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.handler
    }
}

impl std::fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

/// Registry of command descriptors, keyed by canonical name.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, CommandDescriptor>,
    containers: HashSet<String>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every command of a container.
    ///
    /// Atomic: all specs are validated against the current registry before any
    /// descriptor is inserted, so a failed registration leaves no partial
    /// state behind.
    pub fn register(&mut self, container: &dyn CommandContainer) -> Result<(), RegistrationError> {
        let container_name = container.name().to_string();
        if self.containers.contains(&container_name) {
            return Err(RegistrationError::DuplicateContainer(container_name));
        }

        let mut staged: Vec<(String, CommandDescriptor)> = Vec::new();
        for spec in container.commands() {
            let descriptor = build_descriptor(spec, &container_name)?;
            let key = descriptor.name.clone();
            let collides = self.commands.contains_key(&key)
                || staged.iter().any(|(existing, _)| *existing == key);
            if collides {
                return Err(RegistrationError::DuplicateName {
                    name: key,
                    container: container_name,
                });
            }
            staged.push((key, descriptor));
        }

        self.containers.insert(container_name);
        for (key, descriptor) in staged {
            self.commands.insert(key, descriptor);
        }
        Ok(())
    }

    /// Resolve a command name, case-insensitively, exact match only.
    pub fn resolve(&self, name: &str) -> Result<&CommandDescriptor, DispatchError> {
        self.commands
            .get(&name.to_ascii_uppercase())
            .ok_or_else(|| DispatchError::CommandNotFound(name.to_string()))
    }

    /// Look up help text for a command and culture, with default fallback.
    pub fn help_for(&self, name: &str, culture: &str) -> Result<&str, HelpError> {
        let descriptor = self
            .commands
            .get(&name.to_ascii_uppercase())
            .ok_or_else(|| HelpError::UnknownCommand(name.to_string()))?;
        descriptor
            .help
            .lookup(culture)
            .ok_or_else(|| HelpError::NotFound {
                name: descriptor.name.clone(),
                culture: culture.to_string(),
            })
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no commands are registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Canonical names of all registered commands, unsorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }
}

/// Validate one spec and turn it into a descriptor.
fn build_descriptor(
    spec: CommandSpec,
    container: &str,
) -> Result<CommandDescriptor, RegistrationError> {
    if spec.name.is_empty() {
        return Err(RegistrationError::UnsupportedSpec {
            name: spec.name,
            reason: "command name is empty".into(),
        });
    }
    if spec.name.chars().any(char::is_whitespace) {
        return Err(RegistrationError::UnsupportedSpec {
            name: spec.name,
            reason: "command name contains whitespace".into(),
        });
    }

    let canonical = spec.name.to_ascii_uppercase();
    let mut help = HelpCatalog::new();
    for (culture, text) in &spec.help {
        if !help.insert(culture, text) {
            return Err(RegistrationError::DuplicateHelpCulture {
                name: canonical,
                culture: culture.clone(),
            });
        }
    }

    Ok(CommandDescriptor {
        name: canonical,
        arity: spec.arity,
        container: container.to_string(),
        handler: spec.handler,
        help,
    })
}
