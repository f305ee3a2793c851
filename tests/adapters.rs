//! Cross-adapter behavior of the dispatch contract.

use serde_json::{json, Value};
use tempfile::TempDir;
use toolbelt::{
    DockerTool, FinancialDatasetsTool, FunctionTool, HackerNewsTool, ScriptTool, Tool,
};

/// Every adapter rejects an unrecognized action with a message naming the
/// adapter and the action, and has no other observable effect.
#[test]
fn unknown_action_names_adapter_and_action() {
    let dir = TempDir::new().unwrap();
    let mut tools: Vec<(Box<dyn Tool>, &str)> = vec![
        (Box::new(FunctionTool::new()), "Unknown Function action"),
        (Box::new(ScriptTool::new(dir.path())), "Unknown Script action"),
        (Box::new(DockerTool::new()), "Unknown Docker action"),
        (
            Box::new(HackerNewsTool::new().unwrap()),
            "Unknown HackerNews action",
        ),
        (
            Box::new(FinancialDatasetsTool::with_api_key(None).unwrap()),
            "Unknown Financial Datasets action",
        ),
    ];

    for (tool, expected) in tools.iter_mut() {
        let err = tool.dispatch("no_such_action", &[]).unwrap_err();
        assert!(
            err.to_string().contains(*expected),
            "{}: {}",
            tool.name(),
            err
        );
        assert!(err.to_string().contains("no_such_action"));
    }
}

/// Action tables declare every recognized action, and declared actions are
/// the only ones that dispatch.
#[test]
fn action_tables_match_dispatch() {
    let dir = TempDir::new().unwrap();
    let mut tool = ScriptTool::new(dir.path()).with_interpreter("sh");

    for spec in tool.actions() {
        // Dispatching with no arguments never reports "unknown action" for a
        // declared action: it either runs or fails argument validation.
        if let Err(err) = tool.dispatch(spec.name, &[]) {
            assert!(
                !err.to_string().contains("Unknown"),
                "{}: {}",
                spec.name,
                err
            );
        }
    }
}

#[test]
fn function_round_trip_through_the_contract() {
    let mut tool = FunctionTool::new();

    tool.dispatch(
        "register_function",
        &[
            json!("add"),
            json!("let total = 0; for v in args { total += v; } total"),
        ],
    )
    .unwrap();
    tool.dispatch(
        "register_function",
        &[
            json!("multiply"),
            json!("let product = 1; for v in args { product *= v; } product"),
        ],
    )
    .unwrap();

    assert_eq!(
        tool.dispatch("execute_function", &[json!("add"), json!([1, 2, 3, 4, 5])])
            .unwrap(),
        "15"
    );
    assert_eq!(
        tool.dispatch("execute_function", &[json!("multiply"), json!([2, 3, 4])])
            .unwrap(),
        "24"
    );

    let listing: Value =
        serde_json::from_str(&tool.dispatch("list_functions", &[]).unwrap()).unwrap();
    assert_eq!(listing.as_array().unwrap().len(), 2);
    for entry in listing.as_array().unwrap() {
        assert!(entry["name"].is_string());
        assert!(entry["code"].is_string());
    }
}

#[test]
fn expression_evaluation_contract() {
    let mut tool = FunctionTool::new();

    assert_eq!(
        tool.dispatch("evaluate_expression", &[json!("2 + 3 * 4")])
            .unwrap(),
        "14"
    );

    let doubled_evens = tool
        .dispatch(
            "evaluate_expression",
            &[json!("[1, 2, 3, 4, 5].filter(|x| x % 2 == 0).map(|x| x * 2)")],
        )
        .unwrap();
    assert_eq!(
        serde_json::from_str::<Value>(&doubled_evens).unwrap(),
        json!([4, 8])
    );
}

/// A denylisted body fails before execution and leaves no registration
/// behind; the same gate guards one-off expressions.
#[test]
fn denylist_fires_before_any_execution() {
    let mut tool = FunctionTool::new();

    for bad in [r#"system("ls")"#, "`touch /tmp/owned`", r#"ENV["HOME"]"#] {
        let err = tool
            .dispatch("register_function", &[json!("bad"), json!(bad)])
            .unwrap_err();
        assert!(err.to_string().contains("Forbidden code pattern detected"));
    }

    assert_eq!(tool.dispatch("list_functions", &[]).unwrap(), "[]");
    let err = tool
        .dispatch("execute_function", &[json!("bad")])
        .unwrap_err();
    assert!(err.to_string().contains("'bad' not found"));
}

#[test]
fn script_staging_and_stdout_capture() {
    let dir = TempDir::new().unwrap();
    let mut tool = ScriptTool::new(dir.path()).with_interpreter("sh");

    let code = "greeting=hello\necho $greeting\n";
    let result = tool
        .dispatch(
            "save_to_file_and_run",
            &[json!("jobs/greet/run.sh"), json!(code), json!("greeting")],
        )
        .unwrap();
    assert_eq!(result, "hello");

    // Intermediate directories were created and the source is byte-exact.
    let staged = dir.path().join("jobs/greet/run.sh");
    assert_eq!(std::fs::read(&staged).unwrap(), code.as_bytes());

    // The staged file is visible to the file actions.
    let listed = tool.dispatch("list_files", &[]).unwrap();
    assert!(listed.contains("jobs"));
    assert_eq!(
        tool.dispatch("read_file", &[json!("jobs/greet/run.sh")])
            .unwrap(),
        code
    );
}

#[test]
fn script_variable_contract_is_stdout_capture() {
    let dir = TempDir::new().unwrap();
    let mut tool = ScriptTool::new(dir.path()).with_interpreter("sh");

    // The named variable is never extracted from the interpreter; only
    // printed output comes back.
    let silent = tool
        .dispatch("run_code", &[json!("result=42"), json!("result")])
        .unwrap();
    assert_eq!(silent, "Variable result not found");

    let printed = tool
        .dispatch("run_code", &[json!("result=42\necho $result"), json!("result")])
        .unwrap();
    assert_eq!(printed, "42");
}
