use autopilot_core_types::{AutomationError, ElementRef};
use command_protocol::{ElementTarget, Selector};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::policy::AutomationPolicy;
use crate::ports::{ElementSnapshot, PagePorts};

/// Locates one target. Selectors are polled until something matches or the
/// selector timeout elapses; other target forms resolve in a single probe.
pub async fn resolve_target(
    ports: &PagePorts,
    target: &ElementTarget,
    properties: &[String],
    policy: &AutomationPolicy,
    cancel: &CancellationToken,
) -> Result<ElementSnapshot, AutomationError> {
    match target {
        ElementTarget::Selector(selector) => {
            poll_selector(ports, selector, properties, policy, cancel).await
        }
        ElementTarget::Element(element) => snapshot_existing(ports, element, properties).await,
        ElementTarget::ActiveElement => {
            let element = match ports.dom.focused_element().await? {
                Some(element) => element,
                None => ports.dom.document_element().await?,
            };
            snapshot_existing(ports, &element, properties).await
        }
        ElementTarget::Document => {
            let element = ports.dom.document_element().await?;
            snapshot_existing(ports, &element, properties).await
        }
    }
}

async fn snapshot_existing(
    ports: &PagePorts,
    element: &ElementRef,
    properties: &[String],
) -> Result<ElementSnapshot, AutomationError> {
    ports
        .dom
        .snapshot(element, properties)
        .await?
        .ok_or_else(|| AutomationError::ElementResolution(format!("{element} does not exist")))
}

async fn poll_selector(
    ports: &PagePorts,
    selector: &Selector,
    properties: &[String],
    policy: &AutomationPolicy,
    cancel: &CancellationToken,
) -> Result<ElementSnapshot, AutomationError> {
    let started = Instant::now();
    let deadline = started + policy.selector_timeout();
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let found = ports.selector.query(selector, properties).await?;
        if let Some(first) = found.into_iter().next() {
            debug!(%selector, element = %first.element, attempts, "selector resolved");
            return Ok(first);
        }
        if Instant::now() >= deadline {
            return Err(AutomationError::ElementResolution(format!(
                "no element matched {selector} within {} ms",
                policy.selector_timeout_ms
            )));
        }
        trace!(%selector, attempts, "selector matched nothing yet");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(AutomationError::Timeout(format!(
                    "resolution of {selector} was cancelled"
                )));
            }
            _ = tokio::time::sleep(policy.poll_interval()) => {}
        }
    }
}
