//! STACKPRO Resolve
//!
//! Answers two questions for a running service:
//!
//! - where does capability X live in environment E ([`CapabilityResolver`])
//! - is flag F on for tenant T ([`TenantFlagResolver`])
//!
//! Both walk an ordered [`SourceChain`] behind a shared TTL cache. Resolution
//! never fails: an unreachable tier only marks the result `degraded` and the
//! chain falls through to a default.
//!
//! Most hosts only need [`Resolvers`]:
//!
//! ```ignore
//! let resolvers = Resolvers::from_config(ResolverConfig::from_env()?)?;
//! let url = resolvers
//!     .resolve_capability_url(&CapabilityId::new("messaging")?, Environment::Sandbox)
//!     .await;
//! ```

pub mod capability;
pub mod chain;
pub mod directory;
pub mod flag;
pub mod health;
pub mod observer;
pub mod overrides;
pub mod remote;
pub mod service;
pub mod source;
pub mod tiers;

pub use capability::CapabilityResolver;
pub use chain::{CachedResolution, SharedCache, SourceChain};
pub use directory::CapabilityDirectory;
pub use flag::TenantFlagResolver;
pub use health::{HealthSnapshot, HealthTracker, ReachabilityProbe, StubProbe};
pub use observer::{NoopObserver, ResolutionObserver};
pub use overrides::{EnvOverrides, LayeredOverrides, MapOverrides, OverrideSource};
pub use remote::{DisabledParameterStore, HttpParameterStore, ParameterStore};
pub use service::{Resolvers, ResolversBuilder};
pub use source::{SourceOutcome, ValueSource};
pub use tiers::{OverrideTier, RemoteTier};
