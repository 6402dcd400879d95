//! Procedure registration and dispatch.
//!
//! Procedures are:
//!
//! - **Typed**: input and output types are checked at compile time
//! - **Async**: every procedure is an async function
//! - **Id-bound**: each procedure is registered under a stable id that routes
//!   reference
//!
//! The registry erases each procedure to `JSON -> JSON` so that procedures
//! of different types live in one map.
//!
//! # Example
//!
//! ```rust
//! use openproc_core::{InvocationContext, ProcedureError, ProcedureRegistry};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize)]
//! struct GetUser { id: i64 }
//!
//! #[derive(Serialize)]
//! struct User { id: i64, name: String }
//!
//! async fn get_user(_ctx: InvocationContext<()>, req: GetUser) -> Result<User, ProcedureError> {
//!     Ok(User { id: req.id, name: "Alice".to_string() })
//! }
//!
//! let mut registry = ProcedureRegistry::new();
//! registry.register("getUser", get_user);
//! assert!(registry.contains("getUser"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{BuildError, ProcedureError};
use crate::invocation::InvocationContext;
use crate::schema::Issue;

/// Boxed future returned by an erased procedure.
pub type BoxedProcedureResult = Pin<Box<dyn Future<Output = Result<Value, ProcedureError>> + Send>>;

/// A type-erased procedure.
pub type ErasedProcedure<C> =
    Arc<dyn Fn(InvocationContext<C>, Value) -> BoxedProcedureResult + Send + Sync>;

/// Registry mapping procedure ids to erased procedures.
///
/// Registering the same id twice is recorded and reported by
/// [`ProcedureRegistry::check`], which the handler builder calls.
pub struct ProcedureRegistry<C = ()> {
    procedures: HashMap<String, ErasedProcedure<C>>,
    duplicates: Vec<String>,
}

impl<C> Default for ProcedureRegistry<C> {
    fn default() -> Self {
        Self {
            procedures: HashMap::new(),
            duplicates: Vec::new(),
        }
    }
}

impl<C> fmt::Debug for ProcedureRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.procedures.keys().collect();
        ids.sort();
        f.debug_struct("ProcedureRegistry")
            .field("procedures", &ids)
            .field("duplicates", &self.duplicates)
            .finish()
    }
}

impl<C: Send + Sync + 'static> ProcedureRegistry<C> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a typed procedure.
    ///
    /// The procedure must:
    /// - Accept an [`InvocationContext<C>`] and an input type `Req`
    /// - Return a `Future` resolving to `Result<Res, ProcedureError>`
    /// - Have `Req: DeserializeOwned` and `Res: Serialize`
    ///
    /// Input that passed schema validation but does not deserialize into
    /// `Req` is reported as a validation failure. Output that fails to
    /// serialize is an internal error.
    pub fn register<Req, Res, F, Fut>(&mut self, procedure_id: impl Into<String>, procedure: F)
    where
        Req: DeserializeOwned + Send + 'static,
        Res: Serialize + Send + 'static,
        F: Fn(InvocationContext<C>, Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, ProcedureError>> + Send + 'static,
    {
        let procedure = Arc::new(procedure);
        let erased: ErasedProcedure<C> = Arc::new(
            move |ctx: InvocationContext<C>, input: Value| -> BoxedProcedureResult {
                let procedure = Arc::clone(&procedure);
                Box::pin(async move {
                    let request: Req = serde_json::from_value(input).map_err(|e| {
                        ProcedureError::validation(vec![Issue::new(Vec::new(), e.to_string())])
                    })?;

                    let response = procedure(ctx, request).await?;

                    serde_json::to_value(&response).map_err(|e| {
                        ProcedureError::internal_with_source(
                            "failed to serialize procedure output",
                            e,
                        )
                    })
                })
            },
        );

        self.insert(procedure_id.into(), erased);
    }

    /// Registers a procedure working directly on JSON values.
    pub fn register_raw<F, Fut>(&mut self, procedure_id: impl Into<String>, procedure: F)
    where
        F: Fn(InvocationContext<C>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ProcedureError>> + Send + 'static,
    {
        let procedure = Arc::new(procedure);
        let erased: ErasedProcedure<C> = Arc::new(
            move |ctx: InvocationContext<C>, input: Value| -> BoxedProcedureResult {
                let procedure = Arc::clone(&procedure);
                Box::pin(async move { procedure(ctx, input).await })
            },
        );

        self.insert(procedure_id.into(), erased);
    }

    fn insert(&mut self, procedure_id: String, erased: ErasedProcedure<C>) {
        if self.procedures.contains_key(&procedure_id) {
            tracing::warn!(procedure_id = %procedure_id, "procedure registered twice");
            self.duplicates.push(procedure_id);
            return;
        }
        self.procedures.insert(procedure_id, erased);
    }

    /// Invokes a procedure by id.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` for an unknown id (unreachable once the handler is
    /// built) or whatever the procedure returns.
    pub async fn invoke(
        &self,
        procedure_id: &str,
        ctx: InvocationContext<C>,
        input: Value,
    ) -> Result<Value, ProcedureError> {
        let procedure = self.get(procedure_id).ok_or_else(|| {
            ProcedureError::not_found(format!("No procedure '{procedure_id}'"))
        })?;
        procedure(ctx, input).await
    }
}

impl<C> ProcedureRegistry<C> {
    /// Returns the erased procedure for an id.
    #[must_use]
    pub fn get(&self, procedure_id: &str) -> Option<ErasedProcedure<C>> {
        self.procedures.get(procedure_id).cloned()
    }

    /// Returns true if a procedure is registered under `procedure_id`.
    #[must_use]
    pub fn contains(&self, procedure_id: &str) -> bool {
        self.procedures.contains_key(procedure_id)
    }

    /// Returns the registered ids in sorted order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.procedures.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the number of registered procedures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }

    /// Fails if any id was registered more than once.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::DuplicateProcedure`] for the first duplicate.
    pub fn check(&self) -> Result<(), BuildError> {
        match self.duplicates.first() {
            Some(id) => Err(BuildError::DuplicateProcedure(id.clone())),
            None => Ok(()),
        }
    }
}
