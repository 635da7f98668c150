use craftify::preview::RequestSequencer;
use craftify::render::CompileErrorKind;
use craftify::{Applied, PreviewSlot, PreviewView, RequestId};

fn markup(view: PreviewView<'_>) -> String
{   match view
    {   PreviewView::Component(c) => c.render().unwrap().to_markup()
      , other => panic!("expected a component, got {:?}", other)
    }
}

#[test]
fn test_sequencer_is_monotonic()
{   let sequencer = RequestSequencer::new();
    let ids: Vec<RequestId> = (0..4).map(|_| sequencer.next()).collect();
    assert_eq!(ids, vec![RequestId(1), RequestId(2), RequestId(3), RequestId(4)]);
    assert_eq!(RequestId(7).to_string(), "#7");
}

#[test]
fn test_placeholder_before_anything_is_generated()
{   let slot = PreviewSlot::default();
    assert!(matches!(slot.view(), PreviewView::Placeholder));
    assert!(slot.current().is_none());
}

#[test]
fn test_loading_keeps_showing_previous_component()
{   let mut slot = PreviewSlot::default();
    slot.begin(RequestId(1));
    assert!(matches!(slot.view(), PreviewView::Loading { showing: None }));
    assert_eq!(slot.apply(RequestId(1), "<View/>"), Applied::Accepted);
    assert_eq!(markup(slot.view()), "<View/>");

    slot.begin(RequestId(2));
    match slot.view()
    {   PreviewView::Loading { showing: Some(c) } => {
          assert_eq!(c.render().unwrap().to_markup(), "<View/>");
        }
      , other => panic!("expected loading, got {:?}", other)
    }
    assert!(slot.current().is_none());
}

#[test]
fn test_compile_error_is_distinct_from_loading()
{   let mut slot = PreviewSlot::default();
    slot.begin(RequestId(1));
    slot.apply(RequestId(1), "<Card>ok</Card>");
    slot.begin(RequestId(2));
    slot.apply(RequestId(2), "return <Missing/>;");

    match slot.view()
    {   PreviewView::Error(e) => assert_eq!(e.kind, CompileErrorKind::Reference)
      , other => panic!("expected an error, got {:?}", other)
    }

    slot.begin(RequestId(3));
    match slot.view()
    {   PreviewView::Loading { showing: Some(c) } => {
          assert_eq!(c.render().unwrap().to_markup(), "<Card>ok</Card>");
        }
      , other => panic!("expected loading, got {:?}", other)
    }
}

#[test]
fn test_empty_source_clears_the_preview()
{   let mut slot = PreviewSlot::default();
    slot.apply(RequestId(1), "<View/>");
    slot.apply(RequestId(2), "   ");
    assert!(matches!(slot.view(), PreviewView::Placeholder));
}

#[test]
fn test_stale_results_are_discarded()
{   let mut slot = PreviewSlot::default();
    slot.begin(RequestId(1));
    slot.begin(RequestId(2));

    assert_eq!(slot.apply(RequestId(2), "<Text>newer</Text>"), Applied::Accepted);
    assert_eq!(slot.apply(RequestId(1), "<Text>older</Text>"), Applied::Stale);
    assert_eq!(markup(slot.view()), "<Text>newer</Text>");

    // a repeated id is also stale
    assert_eq!(slot.apply(RequestId(2), "<Text>again</Text>"), Applied::Stale);
}

#[test]
fn test_older_result_keeps_loading_while_newer_is_in_flight()
{   let mut slot = PreviewSlot::default();
    slot.begin(RequestId(1));
    slot.begin(RequestId(2));

    assert_eq!(slot.apply(RequestId(1), "<Text>first</Text>"), Applied::Accepted);
    match slot.view()
    {   PreviewView::Loading { showing: Some(c) } => {
          assert_eq!(c.render().unwrap().to_markup(), "<Text>first</Text>");
        }
      , other => panic!("expected loading, got {:?}", other)
    }

    slot.apply(RequestId(2), "<Text>second</Text>");
    assert_eq!(markup(slot.view()), "<Text>second</Text>");
}

#[test]
fn test_abandon_restores_the_last_good_component()
{   let mut slot = PreviewSlot::default();
    slot.begin(RequestId(1));
    slot.abandon(RequestId(1));
    assert!(matches!(slot.view(), PreviewView::Placeholder));

    slot.begin(RequestId(2));
    slot.apply(RequestId(2), "<Badge>v2</Badge>");
    slot.begin(RequestId(3));
    slot.abandon(RequestId(3));
    assert_eq!(markup(slot.view()), "<Badge>v2</Badge>");
}

#[test]
fn test_failure_behind_loading_survives_abandon()
{   let mut slot = PreviewSlot::default();
    slot.begin(RequestId(1));
    slot.apply(RequestId(1), "<Badge>v1</Badge>");
    slot.begin(RequestId(2));
    slot.begin(RequestId(3));

    assert_eq!(slot.apply(RequestId(2), "return <Nope/>;"), Applied::Accepted);
    assert!(matches!(slot.view(), PreviewView::Loading { showing: Some(_) }));

    slot.abandon(RequestId(3));
    match slot.view()
    {   PreviewView::Error(e) => assert_eq!(e.kind, CompileErrorKind::Reference)
      , other => panic!("expected the compile error, got {:?}", other)
    }
    assert!(slot.current().is_none());
}

#[test]
fn test_abandon_of_an_older_request_keeps_loading()
{   let mut slot = PreviewSlot::default();
    slot.begin(RequestId(1));
    slot.begin(RequestId(2));
    slot.abandon(RequestId(1));
    assert!(matches!(slot.view(), PreviewView::Loading { .. }));
}

#[tokio::test]
async fn test_apply_isolated()
{   let mut slot = PreviewSlot::default();
    slot.begin(RequestId(1));
    let applied = slot
      .apply_isolated(RequestId(1), "<Avatar/>".to_string())
      .await;
    assert_eq!(applied, Applied::Accepted);
    assert_eq!(markup(slot.view()), "<Avatar/>");
    assert_eq!(
      slot.apply_isolated(RequestId(1), "<View/>".to_string()).await,
      Applied::Stale
    );
}
