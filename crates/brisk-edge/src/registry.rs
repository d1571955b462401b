//! Accelerator registry keyed by `(OperatorKind, DeviceKind)`.
//!
//! Each entry holds a factory and the packed layout its accelerator consumes
//! and produces. The process-wide registry is built once with the built-in
//! accelerators and is read-only afterwards, so lookups need no locking.
//! Tests and embedders can build private registries with
//! [`AcceleratorRegistry::new`].

use std::collections::HashMap;
use std::sync::OnceLock;

use brisk_core::{BriskError, DeviceKind, LayoutKind, Result};

use crate::accelerator::{LayerAcc, OperatorKind};
use crate::acc;
use crate::config::NetworkConfig;
use crate::params::{LayerParams, OperatorParams, PadParams, ReluParams};

/// Factory that builds an accelerator from (unnarrowed) layer parameters.
pub type AccFactory =
    Box<dyn Fn(&LayerParams, &NetworkConfig) -> Result<Box<dyn LayerAcc>> + Send + Sync>;

struct Entry {
    factory: AccFactory,
    layout: LayoutKind,
}

#[derive(Default)]
pub struct AcceleratorRegistry {
    entries: HashMap<(OperatorKind, DeviceKind), Entry>,
}

impl AcceleratorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in accelerator.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        if let Err(e) = register_builtins(&mut registry) {
            tracing::warn!("skipping built-in accelerator: {e}");
        }
        registry
    }

    /// Record `factory` for `(op, device)`. A key can only be registered once.
    pub fn register<F>(
        &mut self,
        op: OperatorKind,
        device: DeviceKind,
        layout: LayoutKind,
        factory: F,
    ) -> Result<()>
    where
        F: Fn(&LayerParams, &NetworkConfig) -> Result<Box<dyn LayerAcc>> + Send + Sync + 'static,
    {
        if self.entries.contains_key(&(op, device)) {
            return Err(BriskError::Registration(format!(
                "{op} is already registered on {device}"
            )));
        }
        self.entries.insert(
            (op, device),
            Entry {
                factory: Box::new(factory),
                layout,
            },
        );
        Ok(())
    }

    /// Register a constructor that takes the operator's own parameter type.
    pub fn register_typed<P, F>(&mut self, device: DeviceKind, layout: LayoutKind, ctor: F) -> Result<()>
    where
        P: OperatorParams,
        F: Fn(&P, &NetworkConfig) -> Box<dyn LayerAcc> + Send + Sync + 'static,
    {
        self.register(P::KIND, device, layout, move |params, config| {
            let narrowed = P::narrow(params).ok_or_else(|| {
                BriskError::Model(format!(
                    "{} accelerator given {} parameters",
                    P::KIND,
                    params.kind()
                ))
            })?;
            Ok(ctor(narrowed, config))
        })
    }

    /// Build the accelerator for `(op, device)`.
    pub fn create_accelerator(
        &self,
        op: OperatorKind,
        device: DeviceKind,
        params: &LayerParams,
        config: &NetworkConfig,
    ) -> Result<Box<dyn LayerAcc>> {
        let entry = self.lookup(op, device)?;
        if params.kind() != op {
            return Err(BriskError::Model(format!(
                "{op} requested with {} parameters",
                params.kind()
            )));
        }
        let acc = (entry.factory)(params, config)?;
        tracing::debug!(%op, %device, layout = %entry.layout, "created accelerator");
        Ok(acc)
    }

    /// Layout the `(op, device)` accelerator expects for inputs and outputs.
    pub fn required_layout(&self, op: OperatorKind, device: DeviceKind) -> Result<LayoutKind> {
        Ok(self.lookup(op, device)?.layout)
    }

    pub fn contains(&self, op: OperatorKind, device: DeviceKind) -> bool {
        self.entries.contains_key(&(op, device))
    }

    /// Registered keys with their layouts, sorted.
    pub fn keys(&self) -> Vec<(OperatorKind, DeviceKind, LayoutKind)> {
        let mut keys: Vec<_> = self
            .entries
            .iter()
            .map(|(&(op, device), entry)| (op, device, entry.layout))
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, op: OperatorKind, device: DeviceKind) -> Result<&Entry> {
        self.entries.get(&(op, device)).ok_or_else(|| {
            BriskError::UnsupportedConfiguration(format!("{op} is not supported on {device}"))
        })
    }
}

/// Register pad and relu on the naive (planar) and vector CPU (NC4HW4) devices.
pub fn register_builtins(registry: &mut AcceleratorRegistry) -> Result<()> {
    registry.register_typed::<PadParams, _>(DeviceKind::VectorCpu, LayoutKind::Nc4hw4, |p, cfg| {
        Box::new(acc::pad::VectorPadAcc::new(p.clone(), cfg))
    })?;
    registry.register_typed::<PadParams, _>(DeviceKind::Naive, LayoutKind::Nchw, |p, _| {
        Box::new(acc::pad::NaivePadAcc::new(p.clone()))
    })?;
    registry.register_typed::<ReluParams, _>(DeviceKind::VectorCpu, LayoutKind::Nc4hw4, |_, _| {
        Box::new(acc::relu::VectorReluAcc)
    })?;
    registry.register_typed::<ReluParams, _>(DeviceKind::Naive, LayoutKind::Nchw, |_, _| {
        Box::new(acc::relu::NaiveReluAcc)
    })?;
    Ok(())
}

static GLOBAL_REGISTRY: OnceLock<AcceleratorRegistry> = OnceLock::new();

/// The process-wide registry, populated with the built-ins on first use.
pub fn global_registry() -> &'static AcceleratorRegistry {
    GLOBAL_REGISTRY.get_or_init(AcceleratorRegistry::with_builtins)
}
