use std::any::TypeId;
use std::panic::{self, AssertUnwindSafe};

use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{HandlerError, ModuleError};

use super::{fold_keyword, Context, Event, EventBus, EventKind};

/// Handler signature: the module, the event being fired, and the context
/// to act through.
pub type HandlerFn<M> = fn(&mut M, &mut Event, &mut Context<'_>) -> anyhow::Result<()>;

/// What a handler listens for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Subscription {
    /// Exact event kind.
    Event(EventKind),
    /// A trigger keyword, case-folded.
    Trigger(String),
}

impl Subscription {
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            Subscription::Event(kind) => *kind == event.kind(),
            Subscription::Trigger(keyword) => event
                .trigger()
                .map_or(false, |m| m.key() == *keyword),
        }
    }
}

/// One declared `(subscription, handler)` pair.
pub struct Handler<M> {
    pub subscription: Subscription,
    pub run: HandlerFn<M>,
}

impl<M> Handler<M> {
    pub fn on(kind: EventKind, run: HandlerFn<M>) -> Self {
        Handler {
            subscription: Subscription::Event(kind),
            run,
        }
    }

    pub fn trigger(keyword: &str, run: HandlerFn<M>) -> Self {
        Handler {
            subscription: Subscription::Trigger(fold_keyword(keyword)),
            run,
        }
    }
}

/// A bot module. Modules declare their handlers once, when registered;
/// nothing is discovered at dispatch time.
pub trait Module: Send + 'static {
    fn handlers(&self) -> Vec<Handler<Self>>
    where
        Self: Sized;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

/// Object-safe face of a registered module.
pub(crate) trait ErasedModule: Send {
    fn module_type(&self) -> TypeId;
    fn name(&self) -> &'static str;
    fn handler_count(&self) -> usize;
    fn dispatch(&mut self, event: &mut Event, ctx: &mut Context<'_>);
}

pub(crate) struct Loaded<M> {
    module: M,
    handlers: Vec<Handler<M>>,
}

impl<M: Module> Loaded<M> {
    pub(crate) fn new(module: M) -> Self {
        let handlers = module.handlers();
        Loaded { module, handlers }
    }
}

impl<M: Module> ErasedModule for Loaded<M> {
    fn module_type(&self) -> TypeId {
        TypeId::of::<M>()
    }

    fn name(&self) -> &'static str {
        self.module.name()
    }

    fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    fn dispatch(&mut self, event: &mut Event, ctx: &mut Context<'_>) {
        let kind = event.kind().as_str();
        for handler in &self.handlers {
            if !handler.subscription.matches(event) {
                continue;
            }
            let run = handler.run;
            let module = &mut self.module;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| run(module, event, ctx)));
            let failure = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => HandlerError::Failed {
                    module: self.module.name(),
                    event: kind,
                    source: err.into(),
                },
                Err(payload) => HandlerError::Panicked {
                    module: self.module.name(),
                    event: kind,
                    message: panic_message(payload.as_ref()),
                },
            };
            warn!(error = %failure, "handler failed");
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

type Factory =
    Box<dyn Fn(&Config, &str) -> anyhow::Result<Box<dyn ErasedModule>> + Send + Sync>;

/// Maps module identifiers, as named in `bot.modules`, to constructors.
#[derive(Default)]
pub struct ModuleRegistry {
    factories: Vec<(String, Factory)>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor. It receives the connection's config and tag.
    pub fn add<M, F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        M: Module,
        F: Fn(&Config, &str) -> anyhow::Result<M> + Send + Sync + 'static,
    {
        let boxed: Factory = Box::new(move |config: &Config, tag: &str| {
            let module = factory(config, tag)?;
            Ok(Box::new(Loaded::new(module)) as Box<dyn ErasedModule>)
        });
        self.factories.retain(|(n, _)| n != name);
        self.factories.push((name.to_owned(), boxed));
        self
    }

    /// Register a module built with `Default`.
    pub fn add_default<M: Module + Default>(&mut self, name: &str) -> &mut Self {
        self.add(name, |_, _| Ok(M::default()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.iter().map(|(n, _)| n.as_str())
    }

    fn build(&self, name: &str, config: &Config, tag: &str) -> Result<Box<dyn ErasedModule>, ModuleError> {
        let (_, factory) = self
            .factories
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| ModuleError::NotFound(name.to_owned()))?;
        factory(config, tag).map_err(|err| ModuleError::Invalid {
            name: name.to_owned(),
            reason: format!("{:#}", err),
        })
    }

    /// Load one module by identifier onto `tag`.
    pub fn load(&self, name: &str, bus: &EventBus, config: &Config, tag: &str) -> Result<(), ModuleError> {
        info!(module = name, tag, "loading module");
        let module = self.build(name, config, tag)?;
        bus.register_erased(tag, module)
    }

    /// Load every module named in the config, in order. A module that
    /// fails to load is logged and skipped. Returns the loaded names.
    pub fn load_all(&self, bus: &EventBus, config: &Config, tag: &str) -> Vec<String> {
        let mut loaded = Vec::new();
        for name in &config.bot.modules {
            match self.load(name, bus, config, tag) {
                Ok(()) => loaded.push(name.clone()),
                Err(err) => error!(module = %name, tag, error = %err, "module not loaded"),
            }
        }
        loaded
    }
}
