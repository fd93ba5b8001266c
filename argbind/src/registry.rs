//! Command and group registries.
//!
//! Registries are insert-only: once a name is registered it stays resolvable
//! for the lifetime of the registry. There is no clear or replace operation.
//! Commands reach a registry only through [`Engine::register`] and
//! [`Engine::attach`](crate::Engine::attach), which run the classification pipeline.
//!
//! [`Engine::register`]: crate::Engine::register

use crate::command::Command;
use crate::error::ConfigError;
use std::collections::BTreeMap;

/// A named collection of commands and nested groups.
#[derive(Debug)]
pub struct Group {
    name: String,
    help: Option<String>,
    commands: BTreeMap<String, Command>,
    groups: BTreeMap<String, Group>,
}

impl Group {
    pub fn new(name: impl Into<String>, help: Option<String>) -> Self {
        Self {
            name: name.into(),
            help,
            commands: BTreeMap::new(),
            groups: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Add a command; a taken name is an error.
    pub fn insert(&mut self, command: Command) -> Result<(), ConfigError> {
        let name = command.name().to_string();
        if self.commands.contains_key(&name) || self.groups.contains_key(&name) {
            return Err(ConfigError::DuplicateCommand(name));
        }
        self.commands.insert(name, command);
        Ok(())
    }

    /// The nested group `name`, created on first use.
    ///
    /// Re-declaring an existing group returns it unchanged.
    pub fn group(&mut self, name: &str, help: Option<&str>) -> Result<&mut Group, ConfigError> {
        if self.commands.contains_key(name) {
            return Err(ConfigError::DuplicateCommand(name.to_string()));
        }
        Ok(self
            .groups
            .entry(name.to_string())
            .or_insert_with(|| Group::new(name, help.map(str::to_string))))
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    pub fn subgroup(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    pub fn subgroup_mut(&mut self, name: &str) -> Option<&mut Group> {
        self.groups.get_mut(name)
    }

    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.commands.values()
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Resolve a command by path (`["db", "migrate"]`).
    pub fn find(&self, path: &[&str]) -> Option<&Command> {
        match path {
            [] => None,
            [name] => self.get(name),
            [group, rest @ ..] => self.subgroup(group)?.find(rest),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.groups.is_empty()
    }
}

/// The application-owned root registry.
#[derive(Debug)]
pub struct Registry {
    root: Group,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            root: Group::new("", None),
        }
    }

    pub fn insert(&mut self, command: Command) -> Result<(), ConfigError> {
        self.root.insert(command)
    }

    /// Top-level group `name`, created on first use.
    pub fn group(&mut self, name: &str, help: Option<&str>) -> Result<&mut Group, ConfigError> {
        self.root.group(name, help)
    }

    /// Existing group at `path`.
    pub fn group_at(&mut self, path: &[&str]) -> Result<&mut Group, ConfigError> {
        let mut group = &mut self.root;
        for name in path {
            group = group
                .subgroup_mut(name)
                .ok_or_else(|| ConfigError::UnknownGroup(path.join(" ")))?;
        }
        Ok(group)
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.root.get(name)
    }

    pub fn find(&self, path: &[&str]) -> Option<&Command> {
        self.root.find(path)
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}
