//! Layered action-map router
//!
//! The router owns every action map and a stack of active layers. The base
//! map sits at index 0 and is never removed. Events are offered to the
//! topmost layer first; a layer that binds the event's input consumes it, an
//! opaque layer that does not swallows it, and a transparent one lets it fall
//! through to the layer below.

use crate::mapping::actuators::{Actuate, Actuator, ActuatorError, SideEffect};
use crate::steamcon::types::{InputEvent, LogicalInput};
use crossbeam_channel::Receiver;
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Action map '{0}' not found")]
    ActionMapNotFound(String),

    #[error("Actuator bound to {input:?} failed: {source}")]
    Actuator {
        input: LogicalInput,
        #[source]
        source: ActuatorError,
    },
}

/// Named set of bindings
///
/// A binding of `None` is an explicit "do nothing" that still consumes the
/// event in its layer.
#[derive(Debug, Default)]
pub struct ActionMap {
    name: String,
    bindings: BTreeMap<LogicalInput, Option<Actuator>>,
}

impl ActionMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: BTreeMap::new(),
        }
    }

    pub fn bind(&mut self, input: LogicalInput, actuator: Actuator) {
        self.bindings.insert(input, Some(actuator));
    }

    /// Bind `input` to nothing
    pub fn unbind(&mut self, input: LogicalInput) {
        self.bindings.insert(input, None);
    }

    pub fn with(mut self, input: LogicalInput, actuator: Actuator) -> Self {
        self.bind(input, actuator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binds(&self, input: LogicalInput) -> bool {
        self.bindings.contains_key(&input)
    }

    pub fn inputs(&self) -> impl Iterator<Item = LogicalInput> + '_ {
        self.bindings.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn release_all(&mut self) {
        for actuator in self.bindings.values_mut().flatten() {
            actuator.release_all();
        }
    }
}

/// One entry of the layer stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionLayer {
    pub name: String,
    pub is_transparent: bool,
    /// Inputs whose next event is delivered as an unfreeze
    pub frozen: BTreeSet<LogicalInput>,
}

impl ActionLayer {
    fn new(name: &str, is_transparent: bool) -> Self {
        Self {
            name: name.to_string(),
            is_transparent,
            frozen: BTreeSet::new(),
        }
    }
}

#[derive(Debug)]
struct LayerStack {
    layers: Vec<ActionLayer>,
    maps: HashMap<String, ActionMap>,
    shut_down: bool,
}

impl LayerStack {
    fn dispatch(&mut self, event: &InputEvent) -> Result<(), ActuatorError> {
        let input = event.input();
        for (index, layer) in self.layers.iter_mut().enumerate().rev() {
            let Some(map) = self.maps.get_mut(&layer.name) else {
                continue;
            };
            match map.bindings.get_mut(&input) {
                Some(Some(actuator)) => {
                    if layer.frozen.remove(&input) {
                        debug!("{:?} unfreezes {} in '{}'", input, actuator.name(), layer.name);
                        return actuator.unfreeze(event);
                    }
                    debug!("{:?} -> {} in '{}'", input, actuator.name(), layer.name);
                    return actuator.do_event(event);
                }
                Some(None) => return Ok(()),
                None if layer.is_transparent && index > 0 => continue,
                None => return Ok(()),
            }
        }
        Ok(())
    }

    fn push(&mut self, name: &str, transparent: bool) -> Result<(), RouterError> {
        if !self.maps.contains_key(name) {
            return Err(RouterError::ActionMapNotFound(name.to_string()));
        }
        if self.layers.len() > 1 {
            if let Some(top) = self.layers.last_mut() {
                if let Some(map) = self.maps.get(&top.name) {
                    top.frozen.extend(map.inputs());
                }
            }
        }
        self.layers.push(ActionLayer::new(name, transparent));
        info!(
            "Entered layer '{}' ({}), depth {}",
            name,
            if transparent { "transparent" } else { "opaque" },
            self.layers.len()
        );
        Ok(())
    }

    fn pop(&mut self, name: &str) {
        match self.layers.iter().skip(1).position(|layer| layer.name == name) {
            Some(offset) => {
                self.layers.remove(offset + 1);
                info!("Exited layer '{}', depth {}", name, self.layers.len());
            }
            None => debug!("Layer '{}' is not active, nothing to exit", name),
        }
    }

    fn apply(&mut self, effects: &Receiver<SideEffect>) -> Vec<RouterError> {
        let mut errors = Vec::new();
        for effect in effects.try_iter() {
            match effect {
                SideEffect::EnterLayer { name, transparent } => {
                    if let Err(e) = self.push(&name, transparent) {
                        warn!("Rejected layer change: {}", e);
                        errors.push(e);
                    }
                }
                SideEffect::ExitLayer { name } => self.pop(&name),
            }
        }
        errors
    }
}

/// Routes events through the active layers
#[derive(Debug)]
pub struct Router {
    stack: Mutex<LayerStack>,
    effects: Receiver<SideEffect>,
}

impl Router {
    /// `base` becomes the bottom layer; `pool` holds the maps layers can enter.
    /// `effects` is the receiving end of the actuators' context.
    pub fn new(
        base: ActionMap,
        pool: impl IntoIterator<Item = ActionMap>,
        effects: Receiver<SideEffect>,
    ) -> Self {
        let base_layer = ActionLayer::new(base.name(), false);
        let mut maps: HashMap<String, ActionMap> = pool
            .into_iter()
            .map(|map| (map.name.clone(), map))
            .collect();
        if maps.contains_key(base.name()) {
            warn!("Action map '{}' shadows the base map", base.name());
        }
        maps.insert(base.name.clone(), base);
        info!("Router ready with {} action map(s)", maps.len());
        Self {
            stack: Mutex::new(LayerStack {
                layers: vec![base_layer],
                maps,
                shut_down: false,
            }),
            effects,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LayerStack> {
        self.stack.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Deliver one event. Layer changes the actuator requested are applied
    /// before returning; rejected ones are logged.
    pub fn dispatch(&self, event: &InputEvent) -> Result<(), RouterError> {
        let mut stack = self.lock();
        if stack.shut_down {
            return Ok(());
        }
        let result = stack.dispatch(event).map_err(|source| RouterError::Actuator {
            input: event.input(),
            source,
        });
        stack.apply(&self.effects);
        result
    }

    pub fn push_layer(&self, name: &str, transparent: bool) -> Result<(), RouterError> {
        self.lock().push(name, transparent)
    }

    /// Remove the lowest active layer named `name`; the base stays
    pub fn pop_layer(&self, name: &str) {
        self.lock().pop(name)
    }

    /// Apply queued layer changes, e.g. from background macros
    pub fn apply_pending_side_effects(&self) -> Vec<RouterError> {
        self.lock().apply(&self.effects)
    }

    /// Active layer names, bottom first
    pub fn layer_names(&self) -> Vec<String> {
        self.lock().layers.iter().map(|layer| layer.name.clone()).collect()
    }

    pub fn layers(&self) -> Vec<ActionLayer> {
        self.lock().layers.clone()
    }

    /// Release every actuator of every map, active or not
    pub fn shutdown(&self) {
        let mut stack = self.lock();
        if stack.shut_down {
            return;
        }
        stack.shut_down = true;
        for map in stack.maps.values_mut() {
            map.release_all();
        }
        stack.layers.truncate(1);
        // Drop whatever the releases queued
        let _ = self.effects.try_iter().count();
        info!("Router shut down");
    }
}
