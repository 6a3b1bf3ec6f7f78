use std::sync::Arc;

use action_automations::{AutomationDeps, AutomationPolicy, NativeDispatch, PagePorts};
use autopilot_core_types::ContextId;
use cursor_controller::{CursorConfig, CursorController, CursorOverlay, CursorUi, NullOverlay};
use tokio::sync::{Mutex, MutexGuard};

/// One tab, window or browser. Owns the only cursor its automations drive;
/// nothing is shared between contexts.
pub struct BrowsingContext {
    id: ContextId,
    ports: PagePorts,
    cursor: Arc<CursorController>,
    policy: AutomationPolicy,
    native: Option<Arc<dyn NativeDispatch>>,
    turn: Mutex<()>,
}

impl BrowsingContext {
    pub fn new(
        ports: PagePorts,
        cursor: &CursorConfig,
        overlay: Arc<dyn CursorOverlay>,
        policy: AutomationPolicy,
    ) -> Self {
        Self {
            id: ContextId::new(),
            ports,
            cursor: Arc::new(CursorController::from_config(cursor, overlay)),
            policy,
            native: None,
            turn: Mutex::new(()),
        }
    }

    /// Context with a headless cursor.
    pub fn headless(ports: PagePorts, policy: AutomationPolicy) -> Self {
        Self::new(ports, &CursorConfig::headless(), Arc::new(NullOverlay), policy)
    }

    pub fn with_native(mut self, native: Arc<dyn NativeDispatch>) -> Self {
        self.native = Some(native);
        self
    }

    pub fn id(&self) -> &ContextId {
        &self.id
    }

    pub fn ports(&self) -> &PagePorts {
        &self.ports
    }

    pub fn cursor(&self) -> &Arc<CursorController> {
        &self.cursor
    }

    pub fn policy(&self) -> &AutomationPolicy {
        &self.policy
    }

    pub fn deps(&self) -> AutomationDeps {
        let cursor: Arc<dyn CursorUi> = self.cursor.clone();
        let deps = AutomationDeps::new(self.ports.clone(), cursor, self.policy.clone());
        match &self.native {
            Some(native) => deps.with_native(Arc::clone(native)),
            None => deps,
        }
    }

    /// Held while one command runs against this context.
    pub(crate) async fn take_turn(&self) -> MutexGuard<'_, ()> {
        self.turn.lock().await
    }
}
