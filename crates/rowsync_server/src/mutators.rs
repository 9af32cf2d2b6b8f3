//! Mutation schemas and handlers.
//!
//! A [`MutatorRegistry`] maps mutation names to two things: an argument
//! schema, used to decide whether a mutation is well formed, and a handler
//! that applies it. Both are normally registered together with
//! [`MutatorRegistry::register`]. A name may also be declared without a
//! handler; such mutations pass validation and then fail the push, which is
//! how a server that is missing a handler behaves.

use rowsync_protocol::{ClientId, RawMutation};
use rowsync_store::{Client, ClientGroup, StoreError, Transaction};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

/// Result type for mutation handlers.
pub type MutatorResult<T> = Result<T, MutatorError>;

/// Errors raised by mutation handlers.
#[derive(Error, Debug)]
pub enum MutatorError {
    /// Store failure inside the handler.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Arguments did not deserialize into the handler's argument type.
    #[error("invalid arguments: {0}")]
    InvalidArgs(#[from] serde_json::Error),

    /// Domain-level failure.
    #[error("{0}")]
    Failed(String),
}

impl MutatorError {
    /// Creates a domain-level failure.
    pub fn failed(message: impl Into<String>) -> Self {
        MutatorError::Failed(message.into())
    }
}

/// Why a raw mutation was rejected by its schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    /// The mutation has no string `name`.
    #[error("mutation has no name")]
    MissingName,

    /// No schema is declared under this name.
    #[error("unknown mutation \"{0}\"")]
    UnknownName(String),

    /// The arguments do not match the declared schema.
    #[error("invalid arguments for \"{name}\": {reason}")]
    InvalidArgs {
        /// Mutation name.
        name: String,
        /// Deserializer message.
        reason: String,
    },
}

/// A mutation that passed its schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    /// Client that created the mutation.
    pub client_id: ClientId,
    /// Per-client mutation id.
    pub id: u64,
    /// Mutation name.
    pub name: String,
    /// Arguments, `Null` when absent.
    pub args: Value,
    /// Client timestamp in milliseconds.
    pub timestamp: f64,
}

/// Everything a handler can see while applying one mutation.
pub struct MutationContext<'t, 'a> {
    /// The push transaction.
    pub txn: &'t mut Transaction<'a>,
    /// Client group that pushed.
    pub group: &'t ClientGroup,
    /// Client that created the mutation.
    pub client: &'t Client,
    /// The mutation being applied.
    pub mutation: &'t Mutation,
}

impl fmt::Debug for MutationContext<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationContext")
            .field("txn", &self.txn.id())
            .field("group", &self.group.id)
            .field("client", &self.client.id)
            .field("mutation", &self.mutation.name)
            .finish()
    }
}

/// Applies a mutation inside the push transaction.
pub trait Mutator: Send + Sync {
    /// Applies `ctx.mutation`. Returning an error aborts the whole push.
    fn apply(&self, ctx: &mut MutationContext<'_, '_>) -> MutatorResult<()>;
}

/// A handler function taking typed arguments.
struct FnMutator<A, F> {
    f: F,
    _args: PhantomData<fn() -> A>,
}

impl<A, F> Mutator for FnMutator<A, F>
where
    A: DeserializeOwned,
    F: Fn(&mut MutationContext<'_, '_>, A) -> MutatorResult<()> + Send + Sync,
{
    fn apply(&self, ctx: &mut MutationContext<'_, '_>) -> MutatorResult<()> {
        let args = A::deserialize(&ctx.mutation.args)?;
        (self.f)(ctx, args)
    }
}

type ArgsCheck = Arc<dyn Fn(&Value) -> Result<(), serde_json::Error> + Send + Sync>;

fn args_check<A: DeserializeOwned + 'static>() -> ArgsCheck {
    Arc::new(|args: &Value| A::deserialize(args).map(|_| ()))
}

/// Mutation schemas and handlers by name.
#[derive(Default, Clone)]
pub struct MutatorRegistry {
    schemas: BTreeMap<String, ArgsCheck>,
    handlers: BTreeMap<String, Arc<dyn Mutator>>,
}

impl MutatorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a mutation schema without a handler.
    pub fn declare<A: DeserializeOwned + 'static>(mut self, name: impl Into<String>) -> Self {
        self.schemas.insert(name.into(), args_check::<A>());
        self
    }

    /// Declares a schema and registers a handler taking arguments of type `A`.
    pub fn register<A, F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        A: DeserializeOwned + 'static,
        F: Fn(&mut MutationContext<'_, '_>, A) -> MutatorResult<()> + Send + Sync + 'static,
    {
        let name = name.into();
        self.schemas.insert(name.clone(), args_check::<A>());
        self.handlers.insert(
            name,
            Arc::new(FnMutator {
                f,
                _args: PhantomData,
            }),
        );
        self
    }

    /// Registers a handler that accepts any JSON arguments.
    pub fn register_mutator(mut self, name: impl Into<String>, mutator: impl Mutator + 'static) -> Self {
        let name = name.into();
        self.schemas.insert(name.clone(), args_check::<Value>());
        self.handlers.insert(name, Arc::new(mutator));
        self
    }

    /// Checks a raw mutation against its declared schema.
    pub fn parse(&self, raw: &RawMutation) -> Result<Mutation, SchemaViolation> {
        let name = raw.name().ok_or(SchemaViolation::MissingName)?;
        let check = self
            .schemas
            .get(name)
            .ok_or_else(|| SchemaViolation::UnknownName(name.to_string()))?;

        let args = raw.args().cloned().unwrap_or(Value::Null);
        check(&args).map_err(|e| SchemaViolation::InvalidArgs {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Mutation {
            client_id: raw.client_id.clone(),
            id: raw.id,
            name: name.to_string(),
            args,
            timestamp: raw.timestamp,
        })
    }

    /// Returns the handler for `name`.
    pub fn handler(&self, name: &str) -> Option<&dyn Mutator> {
        self.handlers.get(name).map(|m| m.as_ref())
    }

    /// Returns true if a schema is declared under `name`.
    pub fn is_declared(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Declared mutation names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Declared names that have no handler.
    pub fn missing_handlers(&self) -> Vec<&str> {
        self.names()
            .filter(|name| !self.handlers.contains_key(*name))
            .collect()
    }
}

impl fmt::Debug for MutatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutatorRegistry")
            .field("schemas", &self.schemas.keys().collect::<Vec<_>>())
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowsync_protocol::ClientGroupId;
    use rowsync_store::{Scope, Store};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Rename {
        title: String,
    }

    fn rename(ctx: &mut MutationContext<'_, '_>, args: Rename) -> MutatorResult<()> {
        let mut fields = serde_json::Map::new();
        fields.insert("title".into(), Value::String(args.title));
        ctx.txn.put_object("doc/1".into(), fields)?;
        Ok(())
    }

    fn registry() -> MutatorRegistry {
        MutatorRegistry::new()
            .register("rename", rename)
            .declare::<Value>("archive")
    }

    #[test]
    fn parse_accepts_declared_schema() {
        let raw = RawMutation::new("c1", 3, "rename", json!({"title": "hello"}));
        let mutation = registry().parse(&raw).unwrap();
        assert_eq!(mutation.name, "rename");
        assert_eq!(mutation.id, 3);
        assert_eq!(mutation.client_id, ClientId::from("c1"));
    }

    #[test]
    fn parse_rejects_bad_mutations() {
        let registry = registry();

        let mut nameless = RawMutation::new("c1", 1, "rename", json!({}));
        nameless.rest.remove("name");
        assert_eq!(registry.parse(&nameless), Err(SchemaViolation::MissingName));

        let unknown = RawMutation::new("c1", 1, "explode", json!({}));
        assert_eq!(
            registry.parse(&unknown),
            Err(SchemaViolation::UnknownName("explode".into()))
        );

        let bad_args = RawMutation::new("c1", 1, "rename", json!({"title": 7}));
        assert!(matches!(
            registry.parse(&bad_args),
            Err(SchemaViolation::InvalidArgs { .. })
        ));
    }

    #[test]
    fn declared_without_handler() {
        let registry = registry();
        assert!(registry.is_declared("archive"));
        assert!(registry.handler("archive").is_none());
        assert_eq!(registry.missing_handlers(), vec!["archive"]);
    }

    #[test]
    fn handler_applies_typed_args() {
        let store = Store::in_memory();
        let registry = registry();
        let group = ClientGroup::new(ClientGroupId::from("g1"));
        let client = Client::new(ClientId::from("c1"), group.id.clone());
        let mutation = registry
            .parse(&RawMutation::new("c1", 1, "rename", json!({"title": "hi"})))
            .unwrap();

        let mut txn = store.begin(&group.id);
        let mut ctx = MutationContext {
            txn: &mut txn,
            group: &group,
            client: &client,
            mutation: &mutation,
        };
        registry.handler("rename").unwrap().apply(&mut ctx).unwrap();
        txn.commit().unwrap();

        let txn = store.begin(Scope::System);
        let row = txn.get_object(&"doc/1".into()).unwrap();
        assert_eq!(row.field("title"), Some(&json!("hi")));
    }
}
