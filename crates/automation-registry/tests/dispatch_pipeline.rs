use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use action_automations::{
    build, AutomationPolicy, AutomationState, DomError, ElementSnapshot, MemoryPage, PageElement,
    PagePorts, SelectorPort, MIN_SPEED,
};
use async_trait::async_trait;
use automation_registry::{
    AutomationDispatcher, AutomationHandler, AutomationRegistry, BrowsingContext,
};
use autopilot_core_types::{AutomationError, ErrorKind, ExecCtx, Point, Rect};
use autopilot_event_bus::{AutomationEvent, EventKind};
use command_protocol::{ActionCommand, CommandMessage, CommandType, ElementTarget, Selector};
use cursor_controller::CursorUi;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

/// Counts selector queries so tests can prove nothing was resolved.
struct CountingSelector {
    page: Arc<MemoryPage>,
    queries: AtomicUsize,
}

#[async_trait]
impl SelectorPort for CountingSelector {
    async fn query(
        &self,
        selector: &Selector,
        properties: &[String],
    ) -> Result<Vec<ElementSnapshot>, DomError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.page.query(selector, properties).await
    }
}

struct Fixture {
    page: Arc<MemoryPage>,
    selector: Arc<CountingSelector>,
    context: BrowsingContext,
    dispatcher: AutomationDispatcher,
}

fn fixture() -> Fixture {
    let page = Arc::new(MemoryPage::with_elements(
        800.0,
        600.0,
        vec![
            PageElement::new("save", "button", Rect::new(100.0, 100.0, 80.0, 40.0)),
            PageElement::new("email", "input", Rect::new(100.0, 200.0, 200.0, 20.0)).editable(),
            PageElement::new("bio", "textarea", Rect::new(100.0, 260.0, 200.0, 80.0))
                .editable()
                .with_value("line one\nline two"),
            PageElement::new("a", "div", Rect::new(0.0, 0.0, 20.0, 20.0)),
            PageElement::new("b", "div", Rect::new(40.0, 40.0, 20.0, 20.0)),
        ],
    ));
    let selector = Arc::new(CountingSelector {
        page: page.clone(),
        queries: AtomicUsize::new(0),
    });
    let ports = PagePorts {
        selector: selector.clone(),
        dom: page.clone(),
        input: page.clone(),
    };
    let context = BrowsingContext::headless(ports, AutomationPolicy::immediate());
    let dispatcher =
        AutomationDispatcher::new(Arc::new(AutomationRegistry::with_default_handlers()));
    Fixture {
        page,
        selector,
        context,
        dispatcher,
    }
}

fn exec() -> ExecCtx {
    ExecCtx::with_timeout(Default::default(), Duration::from_secs(5))
}

fn message(command: &ActionCommand) -> CommandMessage {
    CommandMessage::from_command(command).unwrap()
}

#[test]
fn every_table_identifier_resolves_to_an_invocable_factory() {
    let registry = AutomationRegistry::with_default_handlers();
    let page = Arc::new(MemoryPage::new(100.0, 100.0));
    let context = BrowsingContext::headless(
        PagePorts::from_page(page),
        AutomationPolicy::immediate(),
    );
    for &kind in CommandType::ALL {
        let handler = registry.resolve(kind.wire_id()).unwrap();
        let automation = handler
            .create(&ActionCommand::new(kind), &[], context.deps())
            .unwrap();
        assert_eq!(automation.command_type(), kind);
        assert_eq!(automation.state(), AutomationState::Created);
    }
}

#[tokio::test]
async fn unknown_command_constructs_nothing() {
    let fx = fixture();
    let err = fx.dispatcher.registry().resolve("foo-bar").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownCommand);

    let mut raw = CommandMessage::new("foo-bar");
    raw.fields
        .insert("target".into(), json!({ "by": "selector", "value": "#save" }));
    let execution = fx.dispatcher.execute(&fx.context, &raw, &exec(), None).await;

    assert!(matches!(execution.result, Err(AutomationError::UnknownCommand(ref id)) if id == "foo-bar"));
    assert!(execution.final_state.is_none());
    assert_eq!(fx.selector.queries.load(Ordering::SeqCst), 0);
    assert!(fx.page.event_log().is_empty());
    assert_eq!(fx.context.cursor().position().await, Point::default());
}

#[tokio::test]
async fn argument_checks_run_before_resolution() {
    let fx = fixture();
    let command = ActionCommand::click(ElementTarget::css("#save")).with_speed(1.5);
    let err = fx
        .dispatcher
        .prepare(&fx.context, &message(&command), &exec())
        .await
        .err()
        .unwrap();

    assert!(matches!(
        err,
        AutomationError::CommandValidation { ref argument, .. } if argument == "speed"
    ));
    assert_eq!(fx.selector.queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_fields_are_a_validation_error() {
    let fx = fixture();
    let mut raw = CommandMessage::new("click");
    raw.fields.insert("speed".into(), json!("fast"));
    let err = fx.dispatcher.prepare(&fx.context, &raw, &exec()).await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::CommandValidation);
}

#[tokio::test]
async fn element_checks_reject_the_wrong_kind_of_element() {
    let fx = fixture();
    let typing = ActionCommand::type_text(ElementTarget::css("#save"), "hello");
    let err = fx
        .dispatcher
        .prepare(&fx.context, &message(&typing), &exec())
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::ElementValidation);

    let mut lines = ActionCommand::targeting(
        CommandType::SelectTextAreaContent,
        ElementTarget::css("#email"),
    );
    lines.options.start_line = Some(0);
    let err = fx
        .dispatcher
        .prepare(&fx.context, &message(&lines), &exec())
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::ElementValidation);
    assert!(fx.page.event_log().is_empty());
}

#[tokio::test]
async fn property_fetch_failure_is_an_element_validation_error() {
    let fx = fixture();
    fx.page.fail_property("isContentEditable");
    let typing = ActionCommand::type_text(ElementTarget::css("#email"), "hello");
    let execution = fx
        .dispatcher
        .execute(&fx.context, &message(&typing), &exec(), None)
        .await;
    assert_eq!(
        execution.result.unwrap_err().kind(),
        ErrorKind::ElementValidation
    );
}

#[tokio::test]
async fn click_message_runs_end_to_end() {
    let fx = fixture();
    let raw: CommandMessage = serde_json::from_value(json!({
        "type": "click",
        "target": { "by": "selector", "value": "#save" },
        "offsetX": 10.0
    }))
    .unwrap();

    let execution = fx.dispatcher.execute(&fx.context, &raw, &exec(), Some(true)).await;

    assert_ok!(&execution.result);
    assert_eq!(execution.final_state, Some(AutomationState::Resolved));
    let kinds: Vec<EventKind> = execution.events.iter().map(AutomationEvent::kind).collect();
    assert_eq!(kinds, vec![EventKind::TargetElementFound]);
    assert!(matches!(
        &execution.events[0],
        AutomationEvent::TargetElementFound(element) if element.as_str() == "save"
    ));
    assert_eq!(fx.context.cursor().position().await, Point::new(110.0, 120.0));
    assert_eq!(fx.selector.queries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn strict_dispatch_reports_a_late_detach() {
    let fx = fixture();
    fx.page.detach_on_resolve("save");
    let command = ActionCommand::click(ElementTarget::css("#save"));

    let execution = fx
        .dispatcher
        .execute(&fx.context, &message(&command), &exec(), Some(true))
        .await;

    assert_eq!(
        execution.result.unwrap_err().kind(),
        ErrorKind::ElementNotInteractable
    );
    assert_eq!(
        execution.final_state,
        Some(AutomationState::Rejected(ErrorKind::ElementNotInteractable))
    );
    assert_eq!(execution.events.len(), 1);
}

#[tokio::test]
async fn drag_between_elements_through_the_dispatcher() {
    let fx = fixture();
    let command =
        ActionCommand::drag_to_element(ElementTarget::css("#a"), ElementTarget::css("#b"));
    let execution = fx
        .dispatcher
        .execute(&fx.context, &message(&command), &exec(), None)
        .await;
    assert_eq!(
        execution.result.unwrap(),
        action_automations::AutomationOutcome::CursorPosition(Point::new(50.0, 50.0))
    );
    assert_eq!(fx.context.cursor().snapshot().await.button, None);
}

#[tokio::test]
async fn text_area_lines_select_the_expected_range() {
    let fx = fixture();
    let mut command = ActionCommand::targeting(
        CommandType::SelectTextAreaContent,
        ElementTarget::css("#bio"),
    );
    command.options.start_line = Some(0);
    command.options.start_pos = Some(5);
    command.options.end_line = Some(1);
    command.options.end_pos = Some(4);

    let execution = fx
        .dispatcher
        .execute(&fx.context, &message(&command), &exec(), None)
        .await;
    match execution.result.unwrap() {
        action_automations::AutomationOutcome::Selection(range) => {
            assert_eq!((range.anchor_offset, range.focus_offset), (5, 13));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn handlers_without_hooks_accept_everything() {
    let registry = AutomationRegistry::new();
    registry
        .register(
            CommandType::Click,
            AutomationHandler::new(|command, _elements, deps| build(command, deps)),
        )
        .unwrap();
    let handler = registry.resolve("click").unwrap();
    let odd = ActionCommand::new(CommandType::Click).with_speed(42.0);

    assert!(handler.ensure_cmd_args(&odd).is_ok());
    assert!(handler.ensure_els_props(&odd, &[]).is_ok());
    assert!(handler.additional_selector_props().is_empty());
    assert!(matches!(
        registry.register(CommandType::Click, AutomationHandler::new(|c, _, d| build(c, d))),
        Err(AutomationError::DuplicateHandler(_))
    ));
}

#[tokio::test]
async fn non_automation_commands_reject_without_side_effects() {
    let fx = fixture();
    for &kind in CommandType::ALL.iter().filter(|kind| !kind.is_automation()) {
        let execution = fx
            .dispatcher
            .execute(&fx.context, &message(&ActionCommand::new(kind)), &exec(), None)
            .await;

        let err = assert_err!(execution.result);
        assert_eq!(err.kind(), ErrorKind::ActionExecution, "{kind}");
        assert_eq!(
            execution.final_state,
            Some(AutomationState::Rejected(ErrorKind::ActionExecution))
        );
        assert!(execution.events.is_empty());
    }
    assert_eq!(fx.selector.queries.load(Ordering::SeqCst), 0);
    assert!(fx.page.event_log().is_empty());
    assert_eq!(fx.context.cursor().position().await, Point::default());
}

#[tokio::test]
async fn speed_below_the_floor_is_a_validation_error() {
    let fx = fixture();
    let slowest = ActionCommand::click(ElementTarget::css("#save")).with_speed(1e-30);

    let execution = fx
        .dispatcher
        .execute(&fx.context, &message(&slowest), &exec(), None)
        .await;

    assert!(matches!(
        execution.result,
        Err(AutomationError::CommandValidation { ref argument, .. }) if argument == "speed"
    ));
    assert!(execution.final_state.is_none());
    assert_eq!(fx.selector.queries.load(Ordering::SeqCst), 0);

    let floor = ActionCommand::hover(ElementTarget::css("#save")).with_speed(MIN_SPEED);
    assert_ok!(fx.dispatcher.prepare(&fx.context, &message(&floor), &exec()).await);
}

#[tokio::test(start_paused = true)]
async fn command_deadline_cuts_selector_polling_short() {
    let page = Arc::new(MemoryPage::new(800.0, 600.0));
    let policy = AutomationPolicy {
        selector_timeout_ms: 1_500,
        poll_interval_ms: 10,
        ..AutomationPolicy::immediate()
    };
    let context = BrowsingContext::headless(PagePorts::from_page(page.clone()), policy);
    let dispatcher =
        AutomationDispatcher::new(Arc::new(AutomationRegistry::with_default_handlers()));
    let exec = ExecCtx::with_timeout(Default::default(), Duration::from_millis(100));
    let started = tokio::time::Instant::now();

    let command = ActionCommand::click(ElementTarget::css("#missing"));
    let execution = dispatcher
        .execute(&context, &message(&command), &exec, None)
        .await;

    let err = assert_err!(execution.result);
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(execution.final_state.is_none());
    assert!(started.elapsed() < Duration::from_millis(1_500));
    assert!(page.event_log().is_empty());
}

#[tokio::test]
async fn cancelled_context_stops_resolution_with_timeout() {
    let fx = fixture();
    let exec = exec();
    exec.cancel.cancel();

    let command = ActionCommand::click(ElementTarget::css("#save"));
    let err = fx
        .dispatcher
        .prepare(&fx.context, &message(&command), &exec)
        .await
        .err()
        .unwrap();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(fx.page.event_log().is_empty());
}
