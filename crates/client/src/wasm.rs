//! Browser runtime adapters.
//!
//! `WasmSpawner` runs settlement tasks on the browser's microtask queue and
//! `TimeoutScheduler` drives poll ticks with `setTimeout`.

use futures::future::LocalFutureObj;
use futures::task::{LocalSpawn, SpawnError};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use weft_reactive::{Scheduler, TimerHandle};

/// Spawns local futures with `wasm_bindgen_futures::spawn_local`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WasmSpawner;

impl LocalSpawn for WasmSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}

/// Schedules tasks on the window's `setTimeout`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeoutScheduler;

impl Scheduler for TimeoutScheduler {
    fn schedule(&self, delay_ms: u64, task: Box<dyn FnOnce()>) -> TimerHandle {
        let window = match web_sys::window() {
            Some(window) => window,
            None => {
                log::warn!("no window available, poll tick dropped");
                return TimerHandle(0);
            }
        };
        let callback = Closure::once_into_js(task);
        let delay = i32::try_from(delay_ms).unwrap_or(i32::MAX);
        match window.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay) {
            Ok(id) => TimerHandle(id as u64),
            Err(err) => {
                log::warn!("setTimeout failed: {:?}", err);
                TimerHandle(0)
            }
        }
    }

    fn cancel(&self, handle: TimerHandle) -> bool {
        // setTimeout ids are positive; 0 marks a tick that was never scheduled.
        if handle.0 == 0 {
            return false;
        }
        match web_sys::window() {
            Some(window) => {
                window.clear_timeout_with_handle(handle.0 as i32);
                true
            }
            None => false,
        }
    }
}
