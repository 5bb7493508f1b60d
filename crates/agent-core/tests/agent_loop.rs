//! End-to-end tests of the agent loop against mock collaborators.

use std::sync::Arc;

use agent_core::{
    AgentConfig, AgentError, AgentLoop, FinishStatus, FunctionCall, HostMethods, MarkupCleaner,
    MockBrowserDriver, MockLlmProvider, RunStatus, TracingAuditSink, Turn,
};

fn agent(
    provider: Arc<MockLlmProvider>,
    driver: Arc<MockBrowserDriver>,
    configure: impl FnOnce(&mut AgentConfig),
) -> AgentLoop {
    let mut config = AgentConfig {
        settle_ms: 0,
        ..AgentConfig::default()
    };
    configure(&mut config);
    AgentLoop::new(
        config,
        provider,
        driver,
        Arc::new(MarkupCleaner),
        Arc::new(HostMethods::new()),
        Arc::new(TracingAuditSink),
    )
}

fn navigate_call(url: &str) -> FunctionCall {
    FunctionCall::new("navigate")
        .with_arg("url", url)
        .with_arg("description", format!("open {url}"))
}

fn finish_call(summary: &str) -> FunctionCall {
    FunctionCall::new("finish")
        .with_arg("status", "PASS")
        .with_arg("summary", summary)
        .with_arg("description", "wrap up the run")
}

fn turn_text(turn: &Turn) -> String {
    turn.text()
}

#[tokio::test]
async fn happy_path_navigates_and_finishes() {
    let provider = Arc::new(MockLlmProvider::new());
    provider.enqueue_call("open the page", navigate_call("https://example.org"));
    provider.enqueue_call("all done", finish_call("visited the page"));
    provider.enqueue_text("confirming completion");

    let driver = Arc::new(MockBrowserDriver::new());
    let outcome = agent(provider.clone(), driver.clone(), |_| {})
        .run("visit example.org")
        .await;

    assert_eq!(outcome.status, RunStatus::Finished);
    assert!(outcome.is_success());
    let summary = outcome.summary.expect("finish summary recorded");
    assert_eq!(summary.status, FinishStatus::Pass);
    assert_eq!(summary.summary, "visited the page");

    let ops = driver.ops();
    assert_eq!(ops[0], "set_viewport 1600x800");
    assert!(ops.contains(&"navigate https://example.org".to_string()));
    assert_eq!(provider.remaining(), 0);
}

#[tokio::test]
async fn silent_turns_get_nudged_before_the_run_goes_on() {
    let provider = Arc::new(MockLlmProvider::new());
    provider.enqueue_text("let me think about this");
    provider.enqueue_call("all done", finish_call("done after the nudge"));
    provider.enqueue_text("confirming completion");

    let driver = Arc::new(MockBrowserDriver::new());
    let outcome = agent(provider.clone(), driver, |_| {}).run("a task").await;

    assert_eq!(outcome.status, RunStatus::Finished);

    // The second invocation must have seen the nudge instruction.
    let histories = provider.seen_histories();
    let second = &histories[1];
    assert!(second
        .iter()
        .any(|turn| turn_text(turn).contains("Continue with your task")));
}

#[tokio::test]
async fn stalled_model_aborts_at_the_ceiling_and_nothing_dispatches_after() {
    let provider = Arc::new(MockLlmProvider::new());
    for _ in 0..5 {
        provider.enqueue_text("hmm");
    }

    let driver = Arc::new(MockBrowserDriver::new());
    let outcome = agent(provider.clone(), driver.clone(), |c| c.safety_ceiling = 3)
        .run("a task")
        .await;

    assert_eq!(outcome.status, RunStatus::Aborted);
    assert!(matches!(
        outcome.error,
        Some(AgentError::SafetyCeilingExceeded { limit: 3 })
    ));
    // Three silent turns consumed, then terminal: the queue still holds two.
    assert_eq!(provider.remaining(), 2);
    // No action was ever dispatched.
    assert_eq!(driver.ops(), vec!["set_viewport 1600x800".to_string()]);
}

#[tokio::test]
async fn validation_mismatch_ends_the_run_with_both_values() {
    let provider = Arc::new(MockLlmProvider::new());
    let report = FunctionCall::new("report_issue")
        .with_arg("expectedValue", "24,99 EUR")
        .with_arg("actualValue", "19,99 EUR")
        .with_arg("errorMessage", "cart total is wrong")
        .with_arg("description", "validate the cart total");
    provider.enqueue_call("price looks off", report);
    provider.enqueue_text("should never be consulted again");

    let outcome = agent(provider.clone(), Arc::new(MockBrowserDriver::new()), |_| {})
        .run("check the cart total")
        .await;

    assert_eq!(outcome.status, RunStatus::Aborted);
    assert!(outcome.message.contains("24,99 EUR"));
    assert!(outcome.message.contains("19,99 EUR"));
    assert_eq!(provider.remaining(), 1);
}

#[tokio::test]
async fn invalid_arguments_are_dropped_without_killing_the_loop() {
    let provider = Arc::new(MockLlmProvider::new());
    // navigate without its required url.
    provider.enqueue_call(
        "broken call",
        FunctionCall::new("navigate").with_arg("description", "open the page"),
    );
    provider.enqueue_call("all done", finish_call("recovered"));
    provider.enqueue_text("confirming completion");

    let driver = Arc::new(MockBrowserDriver::new());
    let outcome = agent(provider.clone(), driver.clone(), |_| {})
        .run("a task")
        .await;

    assert_eq!(outcome.status, RunStatus::Finished);
    assert!(outcome
        .step_log
        .iter()
        .any(|entry| entry.contains("dropped invalid call")));
    assert!(!driver.ops().iter().any(|op| op.starts_with("navigate")));
}

#[tokio::test]
async fn missing_description_queues_a_corrective_instruction() {
    let provider = Arc::new(MockLlmProvider::new());
    provider.enqueue_call(
        "open it",
        FunctionCall::new("navigate").with_arg("url", "https://example.org"),
    );
    provider.enqueue_call("all done", finish_call("done"));
    provider.enqueue_text("confirming completion");

    let outcome = agent(provider.clone(), Arc::new(MockBrowserDriver::new()), |_| {})
        .run("a task")
        .await;

    assert_eq!(outcome.status, RunStatus::Finished);
    let histories = provider.seen_histories();
    let second = &histories[1];
    assert!(second
        .iter()
        .any(|turn| turn_text(turn).contains("description field")));
}

#[tokio::test]
async fn coordinate_actions_feed_back_a_marker_note() {
    let provider = Arc::new(MockLlmProvider::new());
    provider.enqueue_call(
        "click the button",
        FunctionCall::new("click_at")
            .with_arg("x", 500)
            .with_arg("y", 500)
            .with_arg("description", "click the center"),
    );
    provider.enqueue_call("all done", finish_call("clicked"));
    provider.enqueue_text("confirming completion");

    let driver = Arc::new(MockBrowserDriver::new());
    let outcome = agent(provider.clone(), driver.clone(), |_| {})
        .run("a task")
        .await;

    assert_eq!(outcome.status, RunStatus::Finished);
    let histories = provider.seen_histories();
    let second = &histories[1];
    assert!(second
        .iter()
        .any(|turn| turn_text(turn).contains("(500,500)") && turn_text(turn).contains("pink")));
}

#[tokio::test]
async fn history_is_pruned_but_the_task_prompt_survives() {
    let provider = Arc::new(MockLlmProvider::new().with_tokens_per_turn(50));
    provider.enqueue_call("step one", navigate_call("https://example.org/a"));
    provider.enqueue_call("step two", navigate_call("https://example.org/b"));
    provider.enqueue_call("all done", finish_call("browsed around"));
    provider.enqueue_text("confirming completion");

    let outcome = agent(provider.clone(), Arc::new(MockBrowserDriver::new()), |c| {
        c.token_limit = 200;
    })
    .run("the original task prompt")
    .await;

    assert_eq!(outcome.status, RunStatus::Finished);
    for history in provider.seen_histories() {
        // Budget respected on every model invocation: 200 / 50 = 4 turns.
        assert!(history.len() <= 4);
        assert_eq!(turn_text(&history[0]), "the original task prompt");
    }
}
