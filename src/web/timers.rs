//! Cancellable browser timeouts.
//!
//! A `Timeout` owns both the JS timer id and the Rust closure it calls; dropping
//! it clears the timer, so a handle can never outlive the phase that armed it.

use std::collections::HashMap;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::window;

use crate::game::TimerSlot;

pub struct Timeout {
    id: i32,
    _callback: Closure<dyn FnMut()>,
}

impl Timeout {
    pub fn new<F>(delay_ms: f64, callback: F) -> Result<Self, JsValue>
    where
        F: FnMut() + 'static,
    {
        let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
        let closure = Closure::wrap(Box::new(callback) as Box<dyn FnMut()>);
        let id = win.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            delay_ms.max(0.0).round() as i32,
        )?;
        Ok(Self { id, _callback: closure })
    }
}

impl Drop for Timeout {
    fn drop(&mut self) {
        if let Some(w) = window() {
            w.clear_timeout_with_handle(self.id);
        }
    }
}

/// At most one pending `Timeout` per slot.
#[derive(Default)]
pub struct TimerSet {
    slots: HashMap<TimerSlot, Timeout>,
}

impl TimerSet {
    /// Arm `slot`, cancelling whatever was pending there.
    pub fn schedule(&mut self, slot: TimerSlot, timeout: Timeout) {
        self.slots.insert(slot, timeout);
    }

    pub fn cancel(&mut self, slot: TimerSlot) {
        self.slots.remove(&slot);
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
