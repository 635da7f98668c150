use craftify::config::RenderConfig;
use craftify::error::{Error, ErrorKind};
use craftify::render::scope::{PrimitiveCategory, PrimitiveSpec};
use craftify::render::{CompileErrorKind, CompiledComponent, Value};
use craftify::{CompileError, CompileOutcome, RenderNode, Renderer, Scope};
use serde_json::json;

fn compile(source: &str) -> Result<CompileOutcome, CompileError>
{   Renderer::standard().compile(source)
}

fn component(source: &str) -> CompiledComponent
{   match compile(source)
    {   Ok(CompileOutcome::Component(c)) => c
      , other => panic!("expected a component, got {:?}", other)
    }
}

fn markup(source: &str) -> String
{   component(source).render().unwrap().to_markup()
}

fn error_kind(source: &str) -> CompileErrorKind
{   compile(source).unwrap_err().kind
}

#[test]
fn test_blank_source_is_empty()
{   for source in ["", "   ", "\n\t\n"]
    {   assert!(compile(source).unwrap().is_empty());
    }
}

#[test]
fn test_unknown_component_is_a_reference_error()
{   let err = compile("return <UnknownName/>").unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Reference);
    assert!(err.message.contains("UnknownName is not defined"), "{}", err);
    assert!(err.to_string().starts_with("ReferenceError"));
}

#[test]
fn test_compile_error_maps_to_compile_kind()
{   let err = compile("return <Nope/>").unwrap_err();
    assert_eq!(Error::from(err).kind(), ErrorKind::Compile);
}

#[test]
fn test_render_is_deterministic()
{   let source = r#"
      return (
        <View className="screen">
          <Card>
            <Label htmlFor="email">Email</Label>
            <Input id="email" placeholder="you@example.com" />
            <Button variant="default" disabled>Sign in</Button>
          </Card>
        </View>
      );
    "#;
    let compiled = component(source);
    let first = compiled.render().unwrap();
    let second = compiled.render().unwrap();
    assert_eq!(first, second);
    assert_eq!(markup(source), first.to_markup());
    assert_eq!(
      first.to_markup(),
      "<View className=\"screen\"><Card>\
<Label htmlFor=\"email\">Email</Label>\
<Input id=\"email\" placeholder=\"you@example.com\"/>\
<Button disabled variant=\"default\">Sign in</Button>\
</Card></View>"
    );
}

#[test]
fn test_login_screen_from_a_single_tag()
{   let tree = component("<View/>").render().unwrap();
    assert_eq!(tree.name(), Some("View"));
    assert!(tree.children().is_empty());
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_hooks_render_their_initial_snapshot()
{   let source = r#"
      const [email, setEmail] = useState("ada@example.com");
      const count = useRef(3);
      const title = useMemo("Profile");
      useEffect();
      return (
        <Card>
          <h2>{title}</h2>
          <Input value={email} />
          <Text>Count: {count}</Text>
          <Progress value={42.5} />
        </Card>
      );
    "#;
    assert_eq!(
      markup(source),
      "<Card><h2>Profile</h2><Input value=\"ada@example.com\"/>\
<Text>Count: 3</Text><Progress value=\"42.5\"/></Card>"
    );
}

#[test]
fn test_missing_array_items_bind_null()
{   let source = r#"
      const [a, b, c] = useState();
      return <Text>[{a}{b}{c}]</Text>;
    "#;
    assert_eq!(markup(source), "<Text>[]</Text>");
}

#[test]
fn test_hook_errors_are_runtime_errors()
{   assert_eq!(
      error_kind("const [a, b] = useState(1, 2); return <View/>;"),
      CompileErrorKind::Runtime
    );
    assert_eq!(
      error_kind("const [a] = useRef(1); return <View/>;"),
      CompileErrorKind::Runtime
    );
    assert_eq!(
      error_kind("const m = useMemo(); return <View/>;"),
      CompileErrorKind::Runtime
    );
}

#[test]
fn test_names_must_be_used_as_what_they_are()
{   let cases = [
      ("return <Text>{useState}</Text>;", "is a hook and must be called"),
      ("return <Text>{View}</Text>;", "is a component, not a value"),
      ("const x = 1; const y = x(); return <View/>;", "is not callable"),
      ("const y = View(); return <View/>;", "is not a function"),
      ("const y = fetch(\"/api\"); return <View/>;", "fetch is not defined"),
      ("return <useState/>;", "is not a component"),
    ];
    for (source, needle) in cases
    {   let err = compile(source).unwrap_err();
        assert_eq!(err.kind, CompileErrorKind::Reference, "{}", source);
        assert!(err.message.contains(needle), "{}: {}", source, err);
    }
}

#[test]
fn test_locals_cannot_shadow_or_redeclare()
{   assert_eq!(
      error_kind("const View = 1; return <Text/>;"),
      CompileErrorKind::Structure
    );
    assert_eq!(
      error_kind("const a = 1; let a = 2; return <Text/>;"),
      CompileErrorKind::Structure
    );
}

#[test]
fn test_void_primitive_rejects_children()
{   let err = compile("return <Card><Input>name</Input></Card>;").unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Structure);
    assert!(err.message.contains("<Input> cannot have children"));
    assert!(err.message.contains("line 1, column 14"), "{}", err.message);
}

#[test]
fn test_syntax_errors_carry_line_and_column()
{   let err = compile("return (\n  <View>\n    <Text>hi</View>\n);").unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Syntax { line: 3, column: 19 });
    assert!(err.message.contains("expected </Text>, found </View>"));
}

#[test]
fn test_malformed_sources_are_syntax_errors()
{   let sources = [
      "return <View>",
      "return <View/>; extra",
      "return <Text title=>x</Text>",
      "return <Text>{`hi ${name}`}</Text>",
      "return <Text>{\"open</Text>",
      "/* never closed return <View/>",
      "function App() { return <View/>; }\nexport default Other;",
      "import React from 'react'; return <View/>;",
    ];
    for source in sources
    {   let kind = error_kind(source);
        assert!(matches!(kind, CompileErrorKind::Syntax { .. }), "{}: {:?}", source, kind);
    }
}

#[test]
fn test_function_component_forms()
{   let declared = r#"
      export default function LoginScreen() {
        const [email] = useState("");
        return (
          <Card>
            <Label>Email</Label>
            <Input value={email} />
          </Card>
        );
      }
    "#;
    assert_eq!(markup(declared), "<Card><Label>Email</Label><Input value=\"\"/></Card>");

    let exported = "function App() { return <View/>; }\nexport default App;";
    assert_eq!(markup(exported), "<View/>");
}

#[test]
fn test_comments_and_empty_expressions()
{   let source = r#"
      // Login screen
      /* generated */
      return (
        <View>
          {/* header */}
          <Text>Hi</Text>
          {}
        </View>
      );
    "#;
    assert_eq!(markup(source), "<View><Text>Hi</Text></View>");
}

#[test]
fn test_fragments_flatten()
{   let tree = component("return (<><Text>a</Text><Text>b</Text></>);")
      .render()
      .unwrap();
    assert_eq!(tree.name(), Some("Fragment"));
    assert_eq!(tree.children().len(), 2);

    assert_eq!(markup("return <><View/></>;"), "<View/>");
    assert_eq!(
      markup("return <Card><><Text>a</Text></><Text>b</Text></Card>;"),
      "<Card><Text>a</Text><Text>b</Text></Card>"
    );
}

#[test]
fn test_text_whitespace_and_escaping()
{   let source = "return (\n<Text title='say \"hi\"'>\n  Fish &\n  Chips\n</Text>);";
    assert_eq!(
      markup(source),
      "<Text title=\"say &quot;hi&quot;\">Fish &amp; Chips</Text>"
    );
    assert_eq!(
      markup("return <Text>Hello <span>world</span>!</Text>;"),
      "<Text>Hello <span>world</span>!</Text>"
    );
}

#[test]
fn test_render_node_queries()
{   let tree = component(r#"
      return (
        <ul>
          <li><Star /> One</li>
          <li><Star /> Two</li>
        </ul>
      );
    "#).render().unwrap();
    assert_eq!(tree.find_all("Star").len(), 2);
    assert_eq!(tree.find_all("li")[1].text_content(), " Two");
    assert_eq!(tree.len(), 7);
    assert_eq!(
      serde_json::to_value(&tree.children()[0].children()[1]).unwrap(),
      json!({ "type": "text", "text": " One" })
    );
}

#[test]
fn test_scope_values_are_readable()
{   let scope = Scope::standard()
      .with_value("appName", Value::Str("Craftify".to_string()))
      .with_value("version", Value::Number(2.0));
    let renderer = Renderer::new(scope, RenderConfig::default());
    let tree = renderer
      .compile("return <Text>{appName} v{version}</Text>;")
      .unwrap()
      .into_component()
      .unwrap()
      .render()
      .unwrap();
    assert_eq!(tree.text_content(), "Craftify v2");
}

#[test]
fn test_closed_scope_only_admits_its_names()
{   let scope = Scope::empty()
      .with_element("Box", PrimitiveSpec::container(PrimitiveCategory::Layout));
    let renderer = Renderer::new(scope, RenderConfig::default());
    assert!(renderer.compile("return <Box>ok</Box>;").is_ok());
    let err = renderer.compile("return <View/>;").unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Reference);
}

#[test]
fn test_standard_scope_contents()
{   let scope = Scope::standard();
    for name in ["View", "Card", "Button", "Input", "AlertTriangle", "div", "useState"]
    {   assert!(scope.contains(name), "{}", name);
    }
    for name in ["fetch", "window", "require", "eval"]
    {   assert!(!scope.contains(name), "{}", name);
    }
}

#[test]
fn test_size_budget()
{   let limits = RenderConfig { max_source_bytes: 16, ..RenderConfig::default() };
    let renderer = Renderer::new(Scope::standard(), limits);
    let err = renderer.compile("return <View><Text>too long</Text></View>;").unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Budget);
}

#[test]
fn test_depth_budget()
{   let depth = 100;
    let source = format!("{}{}", "<View>".repeat(depth), "</View>".repeat(depth));
    assert_eq!(error_kind(&source), CompileErrorKind::Budget);

    let shallow = format!("{}{}", "<View>".repeat(10), "</View>".repeat(10));
    assert!(compile(&shallow).is_ok());
}

fn nested_calls(callee: &str, depth: usize) -> String
{   format!(
      "const a = {}1{};\nreturn <View/>;",
      format!("{}(", callee).repeat(depth),
      ")".repeat(depth)
    )
}

#[test]
fn test_nested_call_depth_budget()
{   let source = nested_calls("a", 21_000);
    assert!(source.len() < RenderConfig::default().max_source_bytes);
    let err = compile(&source).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Budget);
    assert!(err.message.contains("nesting exceeds 64 levels"), "{}", err);

    let attr = format!(
      "return <Text title={{{}\"x\"{}}}/>;",
      "useMemo(".repeat(200),
      ")".repeat(200)
    );
    assert_eq!(error_kind(&attr), CompileErrorKind::Budget);

    assert_eq!(markup(&nested_calls("useMemo", 3)), "<View/>");
}

#[tokio::test]
async fn test_nested_call_depth_budget_isolated()
{   let err = Renderer::standard()
      .compile_isolated(nested_calls("a", 21_000))
      .await
      .unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Budget);
}

#[test]
fn test_node_budget()
{   let limits = RenderConfig { max_nodes: 10, ..RenderConfig::default() };
    let renderer = Renderer::new(Scope::standard(), limits);
    let source = format!("<View>{}</View>", "<Star/>".repeat(20));
    let err = renderer.compile(&source).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Budget);
}

#[tokio::test]
async fn test_compile_isolated()
{   let renderer = Renderer::standard();
    let outcome = renderer
      .compile_isolated("return <Card><Text>ok</Text></Card>;".to_string())
      .await
      .unwrap();
    let tree = outcome.component().unwrap().render().unwrap();
    assert_eq!(tree.to_markup(), "<Card><Text>ok</Text></Card>");

    let err = renderer
      .compile_isolated("return <Missing/>;".to_string())
      .await
      .unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Reference);

    assert!(renderer.compile_isolated(String::new()).await.unwrap().is_empty());
}

#[test]
fn test_text_node_helpers()
{   let text = RenderNode::Text { text: "hi".to_string() };
    assert_eq!(text.name(), None);
    assert!(text.children().is_empty());
    assert_eq!(text.to_markup(), "hi");
}
