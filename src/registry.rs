//! Imported component names.
//!
//! With [`RegistryScope::Process`] a name imported by any compilation stays
//! registered for every later compilation in the same process, so a tag
//! with that name compiles as a component invocation even in a file that
//! never imports it. [`RegistryScope::Session`] keeps the set per
//! invocation.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

lazy_static! {
    static ref IMPORTED_COMPONENTS: Mutex<HashSet<String>> = Mutex::new(HashSet::new());
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistryScope {
    #[default]
    Process,
    Session,
}

#[derive(Debug)]
pub struct ComponentRegistry {
    scope: RegistryScope,
    session: HashSet<String>,
}

impl ComponentRegistry {
    pub fn new(scope: RegistryScope) -> Self {
        Self {
            scope,
            session: HashSet::new(),
        }
    }

    pub fn register(&mut self, name: &str) {
        match self.scope {
            RegistryScope::Process => {
                IMPORTED_COMPONENTS
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(name.to_string());
            }
            RegistryScope::Session => {
                self.session.insert(name.to_string());
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        match self.scope {
            RegistryScope::Process => IMPORTED_COMPONENTS
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(name),
            RegistryScope::Session => self.session.contains(name),
        }
    }
}
