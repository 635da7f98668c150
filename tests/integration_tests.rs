mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{app_code, instant_policy, ok, ScriptedCompletion};
use craftify::config::ProviderConfig;
use craftify::{
  CraftBackend, CraftConfig, GeminiClient, GenerationRequest, Orchestrator,
  Origin, RequestId, TaskKind,
};
use serde_json::json;

fn backend(stub: Arc<ScriptedCompletion>) -> CraftBackend
{   CraftBackend::new(Orchestrator::new(stub, instant_policy()))
}

#[tokio::test]
async fn test_backend_initialization()
{   craftify::init_logging();
    let backend = backend(Arc::new(ScriptedCompletion::failing()));
    tokio::time::sleep(Duration::from_millis(10)).await;
    let result = backend.shutdown().await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_backend_get_tasks()
{   let backend = backend(Arc::new(ScriptedCompletion::failing()));
    let mut rx = backend.get_tasks().await.unwrap();
    let tasks = rx.recv().await.unwrap().unwrap();
    assert_eq!(tasks, vec![
      (TaskKind::AppCode, "generateAppFromDescription".to_string()),
      (TaskKind::Theme, "generateThemeFromDescription".to_string()),
      (TaskKind::Suggestions, "suggestImprovementsToDescription".to_string()),
    ]);
    backend.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_backend_generate()
{   let stub = Arc::new(ScriptedCompletion::new(vec![
      ok(app_code("<View/>", "ok")),
    ]));
    let backend = backend(stub.clone());

    let mut rx = backend
      .generate(GenerationRequest::describe(TaskKind::AppCode, "a login screen"))
      .await
      .unwrap();
    let generated = rx.recv().await.unwrap().unwrap();

    assert_eq!(generated.request_id, RequestId(1));
    let output = generated.result.output().unwrap();
    assert_eq!(output.origin, Origin::Model);
    assert_eq!(output.get("componentCode"), Some("<View/>"));
    assert_eq!(stub.calls(), 1);
    backend.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_backend_tags_requests_in_order()
{   let backend = backend(Arc::new(ScriptedCompletion::failing()));

    let mut first = backend
      .generate(GenerationRequest::describe(TaskKind::Theme, "dark"))
      .await
      .unwrap();
    let mut second = backend
      .generate(GenerationRequest::describe(TaskKind::Theme, "light"))
      .await
      .unwrap();

    let first = first.recv().await.unwrap().unwrap();
    let second = second.recv().await.unwrap().unwrap();
    assert!(first.request_id < second.request_id);
    assert!(first.result.output().unwrap().is_fallback());
    backend.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_backend_reports_invalid_input()
{   let stub = Arc::new(ScriptedCompletion::failing());
    let backend = backend(stub.clone());

    let mut rx = backend
      .generate(GenerationRequest::describe(TaskKind::Suggestions, ""))
      .await
      .unwrap();
    let reply = rx.recv().await.unwrap();
    assert!(matches!(reply, Err(craftify::Error::Validation(_))));
    assert_eq!(stub.calls(), 0);
    backend.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_backend_routed_requests()
{   let stub = Arc::new(ScriptedCompletion::routed(vec![
      ("sunset", Duration::ZERO, json!({ "themeCode": "orange" })),
    ]));
    let backend = backend(stub);

    let mut rx = backend
      .generate(GenerationRequest::describe(TaskKind::Theme, "sunset palette"))
      .await
      .unwrap();
    let generated = rx.recv().await.unwrap().unwrap();
    assert_eq!(
      generated.result.output().unwrap().get("themeCode"),
      Some("orange")
    );
    backend.shutdown().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_gemini_generate_app()
{   let Some(key) = CraftConfig::api_key_from_env()
    else
    {   println!("Warning: GEMINI_API_KEY not set");
        return;
    };
    craftify::init_logging();

    let client = Arc::new(GeminiClient::new(Some(key), ProviderConfig::default()));
    let orchestrator = Orchestrator::from_config(client, &CraftConfig::default())
      .unwrap();
    let result = orchestrator
      .generate_from_description(TaskKind::AppCode, "a login screen with email and password")
      .await
      .unwrap();

    let output = result.output().unwrap();
    println!("attempts: {}", result.attempts());
    println!("{}", output.get("componentCode").unwrap_or_default());
    let compiled = craftify::Renderer::standard()
      .compile(output.get("componentCode").unwrap_or_default());
    println!("compiled: {:?}", compiled.map(|o| o.is_empty()));
}
