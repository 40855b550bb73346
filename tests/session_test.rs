//! Session behaviour against the embedded graph

mod common;

use std::sync::Arc;

use common::{app, Schemas};
use samyama_ogm::client::Step;
use samyama_ogm::element::SlotValue;
use samyama_ogm::schema::DIRTY;
use samyama_ogm::{
    bind_prop, DataType, Edge, Element, ElementRef, ElementRole, ElementSchema, GraphClient,
    ImmutableMode, LockingMode, OgmError, Property, PropertyValue, Traversal, Vertex, VertexRef,
};

fn person(s: &Schemas, name: &str) -> VertexRef {
    let mut v = Vertex::new(&s.person).unwrap();
    v.set("name", name).unwrap();
    v.into_ref()
}

fn account() -> Arc<ElementSchema> {
    ElementSchema::vertex("Account")
        .property("owner", Property::new(DataType::String))
        .locking(LockingMode::OptimisticLocking)
        .build()
        .unwrap()
}

fn id_of(v: &VertexRef) -> PropertyValue {
    v.read().id().cloned().unwrap()
}

/// Matches the write that strips a committed tag
fn is_commit(t: &Traversal) -> bool {
    matches!(t.steps().first(), Some(Step::E { ids }) if ids.is_empty())
        && t
            .steps()
            .iter()
            .any(|s| matches!(s, Step::Properties { keys } if keys.iter().any(|k| k == DIRTY)))
}

#[tokio::test]
async fn test_flush_writes_in_queue_order() {
    let (app, client, s) = app();
    let session = app.session();
    let leif = person(&s, "leif");
    let jon = person(&s, "jon");
    let knows = Edge::between(&s.knows, &leif, &jon).unwrap().into_ref();

    session.add([leif.clone(), jon.clone()]);
    session.add([knows.clone()]);
    assert_eq!(session.pending_len(), 3);
    session.flush(None).await.unwrap();
    assert_eq!(session.pending_len(), 0);

    let leif_id = id_of(&leif).as_i64().unwrap();
    let jon_id = id_of(&jon).as_i64().unwrap();
    assert!(leif_id < jon_id);

    let edge_id = knows.read().id().cloned().unwrap();
    let graph = client.graph_read().await;
    assert_eq!(graph.vertex_count(), 2);
    assert_eq!(graph.edge_count(), 1);
    assert_eq!(graph.edge_value(&edge_id, "notes"), Some("N/A".into()));
}

#[tokio::test]
async fn test_edge_endpoints_must_be_saved_first() {
    let (app, _client, s) = app();
    let session = app.session();
    let leif = person(&s, "leif");
    let jon = person(&s, "jon");
    let knows = Edge::between(&s.knows, &leif, &jon).unwrap().into_ref();

    let err = session.save_edge(&knows).await.unwrap_err();
    assert!(matches!(err, OgmError::Element(_)));
    assert!(knows.read().id().is_none());
}

#[tokio::test]
async fn test_identity_map_returns_live_object() {
    let (app, client, s) = app();
    let session = app.session();
    let leif = person(&s, "leif");
    session.save_vertex(&leif).await.unwrap();
    let id = id_of(&leif);

    client
        .iterate(&Traversal::new().v(id.clone()).property("name", "leifur"))
        .await
        .unwrap();

    let found = session.next(&Traversal::new().v(id)).await.unwrap().unwrap();
    let found = found.as_vertex().unwrap();
    assert!(Arc::ptr_eq(found, &leif));
    assert_eq!(leif.read().get("name"), Some(&"leifur".into()));
}

#[tokio::test]
async fn test_identity_map_holds_inside_composite_results() {
    let (app, _client, s) = app();
    let session = app.session();
    let leif = person(&s, "leif");
    session.save_vertex(&leif).await.unwrap();

    let folded = session
        .next(&Traversal::new().v(id_of(&leif)).fold())
        .await
        .unwrap()
        .unwrap();
    let members = folded.as_list().unwrap();
    assert_eq!(members.len(), 1);
    assert!(Arc::ptr_eq(members[0].as_vertex().unwrap(), &leif));
    assert_eq!(session.current_len(), 1);
}

#[tokio::test]
async fn test_resave_after_external_delete_takes_new_id() {
    let (app, client, s) = app();
    let session = app.session();
    let leif = person(&s, "leif");
    session.save_vertex(&leif).await.unwrap();
    let old_id = id_of(&leif);

    client
        .iterate(&Traversal::new().v(old_id.clone()).drop())
        .await
        .unwrap();
    session.save_vertex(&leif).await.unwrap();

    let new_id = id_of(&leif);
    assert_ne!(new_id, old_id);
    assert!(session.current(ElementRole::Vertex, &old_id).is_none());
    assert!(session
        .current(ElementRole::Vertex, &new_id)
        .unwrap()
        .ptr_eq(&ElementRef::Vertex(leif.clone())));
    assert!(matches!(
        leif.write().set_id(old_id),
        Err(OgmError::Element(_))
    ));
}

#[tokio::test]
async fn test_fresh_session_deserializes_registered_type() {
    let (app, _client, s) = app();
    let writer = app.session();
    let dave = person(&s, "dave");
    dave.write()
        .set("nicknames", SlotValue::list(["sly", "guy"]))
        .unwrap();
    dave.write().set("age", 36).unwrap();
    writer.save_vertex(&dave).await.unwrap();

    let reader = app.session();
    let results = reader
        .to_list(&reader.traversal(Some(&*s.person)))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);

    {
        let found = results[0].as_vertex().unwrap();
        assert!(!Arc::ptr_eq(found, &dave));
        let found = found.read();
        assert!(Arc::ptr_eq(found.schema(), &s.person));
        assert_eq!(found.get("name"), Some(&"dave".into()));
        assert_eq!(found.get("age"), Some(&PropertyValue::Integer(36)));
        assert_eq!(found.vertex_property("nicknames").unwrap().len(), 2);
    }
    assert_eq!(reader.current_len(), 1);

    let again = reader.next(&Traversal::new().v(id_of(&dave))).await.unwrap().unwrap();
    assert!(Arc::ptr_eq(again.as_vertex().unwrap(), results[0].as_vertex().unwrap()));
}

#[tokio::test]
async fn test_submit_flushes_pending_first() {
    let (app, _client, s) = app();
    let session = app.session();
    session.add([person(&s, "leif"), person(&s, "jon")]);

    let count = session
        .next(&session.traversal(Some(&*s.person)).count())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(count.as_value(), Some(&PropertyValue::Integer(2)));
    assert_eq!(session.pending_len(), 0);
}

#[tokio::test]
async fn test_unregistered_label_becomes_generic() {
    let (app, client, _s) = app();
    client
        .iterate(&Traversal::new().add_v("robot").property("serial", "r2"))
        .await
        .unwrap();

    let session = app.session();
    let robot = session
        .next(&Traversal::new().v_all().has_label("robot"))
        .await
        .unwrap()
        .unwrap();
    let robot = robot.as_vertex().unwrap().read();
    assert_eq!(robot.schema().label(), "generic_vertex");
    assert_eq!(robot.label(), "robot");
    assert_eq!(robot.undeclared().get("serial"), Some(&"r2".into()));
}

#[tokio::test]
async fn test_edge_query_stubs_endpoints() {
    let (app, _client, s) = app();
    let writer = app.session();
    let leif = person(&s, "leif");
    let jon = person(&s, "jon");
    writer.save_vertex(&leif).await.unwrap();
    writer.save_vertex(&jon).await.unwrap();
    let knows = Edge::between(&s.knows, &leif, &jon).unwrap().into_ref();
    knows.write().set("notes", "colleagues").unwrap();
    writer.save_edge(&knows).await.unwrap();

    let reader = app.session();
    let found = reader
        .next(&reader.traversal(Some(&*s.knows)))
        .await
        .unwrap()
        .unwrap();
    let edge = found.as_edge().unwrap().read();
    assert_eq!(edge.get("notes"), Some(&"colleagues".into()));
    let source = edge.source().unwrap().read();
    assert_eq!(source.id(), Some(&id_of(&leif)));
    assert_eq!(source.label(), "generic_vertex");
    assert_eq!(edge.target().unwrap().read().id(), Some(&id_of(&jon)));
}

#[tokio::test]
async fn test_immutable_update_is_rejected() {
    let (app, _client, _s) = app();
    let monument = ElementSchema::vertex("Monument")
        .property("name", Property::new(DataType::String))
        .immutable(ImmutableMode::Simple)
        .build()
        .unwrap();
    let session = app.session();
    let mut v = Vertex::new(&monument).unwrap();
    v.set("name", "obelisk").unwrap();
    let v = v.into_ref();

    session.save_vertex(&v).await.unwrap();
    v.write().set("name", "spire").unwrap();
    let err = session.save_vertex(&v).await.unwrap_err();
    assert!(matches!(err, OgmError::Immutable(_)));
}

#[tokio::test]
async fn test_remove_vertex_evicts_and_drops_edges() {
    let (app, client, s) = app();
    let session = app.session();
    let leif = person(&s, "leif");
    let jon = person(&s, "jon");
    session.save_vertex(&leif).await.unwrap();
    session.save_vertex(&jon).await.unwrap();
    let knows = Edge::between(&s.knows, &leif, &jon).unwrap().into_ref();
    session.save_edge(&knows).await.unwrap();
    assert_eq!(session.current_len(), 3);

    session.remove_vertex(&leif).await.unwrap();
    assert!(session.current(ElementRole::Vertex, &id_of(&leif)).is_none());
    assert!(session.get_vertex(&leif).await.unwrap().is_none());
    let graph = client.graph_read().await;
    assert_eq!(graph.vertex_count(), 1);
    assert_eq!(graph.edge_count(), 0);
}

#[tokio::test]
async fn test_remove_edge() {
    let (app, client, s) = app();
    let session = app.session();
    let leif = person(&s, "leif");
    let jon = person(&s, "jon");
    session.add([leif.clone(), jon.clone()]);
    session.flush(None).await.unwrap();
    let knows = Edge::between(&s.knows, &leif, &jon).unwrap().into_ref();
    session.save_edge(&knows).await.unwrap();
    assert!(session.get_edge(&knows).await.unwrap().is_some());

    session.remove_edge(&knows).await.unwrap();
    assert!(session.get_edge(&knows).await.unwrap().is_none());
    assert_eq!(client.graph_read().await.edge_count(), 0);
}

#[tokio::test]
async fn test_locking_flush_commits_tag() {
    let (app, client, _s) = app();
    let session = app.session();
    let mut v = Vertex::new(&account()).unwrap();
    v.set("owner", "leif").unwrap();
    let v = v.into_ref();

    session.add([v.clone()]);
    session.flush(None).await.unwrap();

    let id = id_of(&v);
    assert!(v.read().dirty().is_none());
    let graph = client.graph_read().await;
    assert!(graph.vertex_values(&id, DIRTY).is_empty());
    assert_eq!(graph.vertex_values(&id, "owner"), vec![PropertyValue::from("leif")]);
}

#[tokio::test]
async fn test_failed_commit_rolls_back_created_vertex() {
    let (app, client, _s) = app();
    let session = app.session();
    let v = Vertex::new(&account()).unwrap().into_ref();

    client.fail_when(is_commit);
    session.add([v.clone()]);
    let err = session.flush(None).await.unwrap_err();
    assert!(matches!(err, OgmError::Backend(_)));

    assert!(v.read().id().is_none());
    assert!(v.read().dirty().is_none());
    assert_eq!(session.current_len(), 0);
    assert_eq!(client.graph_read().await.vertex_count(), 0);
}

#[tokio::test]
async fn test_failed_update_keeps_existing_vertex() {
    let (app, client, _s) = app();
    let session = app.session();
    let mut v = Vertex::new(&account()).unwrap();
    v.set("owner", "leif").unwrap();
    let v = v.into_ref();
    session.save_vertex(&v).await.unwrap();
    let id = id_of(&v);

    client.fail_when(is_commit);
    v.write().set("owner", "jon").unwrap();
    session.add([v.clone()]);
    assert!(session.flush(None).await.is_err());
    client.clear_failure();

    assert_eq!(v.read().id(), Some(&id));
    let graph = client.graph_read().await;
    assert_eq!(graph.vertex_count(), 1);
    assert!(graph.vertex_values(&id, DIRTY).is_empty());
}

#[tokio::test]
async fn test_conflict_check() {
    let (app, client, _s) = app();
    let session = app.session();
    let schema = account();

    let mut kept = Vertex::new(&schema).unwrap();
    kept.set("owner", "leif").unwrap();
    let kept = kept.into_ref();
    let (key, value) = bind_prop(&schema, "owner", "leif").unwrap();
    session.add([kept.clone()]);
    session
        .flush(Some(&Traversal::new().has(key.clone(), value)))
        .await
        .unwrap();
    assert!(kept.read().id().is_some());

    let mut rejected = Vertex::new(&schema).unwrap();
    rejected.set("owner", "jon").unwrap();
    let rejected = rejected.into_ref();
    session.add([rejected.clone()]);
    session
        .flush(Some(&Traversal::new().has(key, "nobody")))
        .await
        .unwrap();
    assert!(rejected.read().id().is_none());
    assert!(session
        .current(ElementRole::Vertex, &id_of(&kept))
        .unwrap()
        .ptr_eq(&ElementRef::Vertex(kept.clone())));
    assert_eq!(client.graph_read().await.vertex_count(), 1);
}

#[tokio::test]
async fn test_conflict_check_keeps_locking_edge() {
    let (app, client, s) = app();
    let session = app.session();
    let follows = ElementSchema::edge("Follows")
        .property("since", Property::new(DataType::Integer))
        .locking(LockingMode::OptimisticLocking)
        .build()
        .unwrap();
    let leif = person(&s, "leif");
    let jon = person(&s, "jon");
    session.save_vertex(&leif).await.unwrap();
    session.save_vertex(&jon).await.unwrap();

    let mut edge = Edge::between(&follows, &leif, &jon).unwrap();
    edge.set("since", 2019).unwrap();
    let edge = edge.into_ref();
    session.add([edge.clone()]);
    session.flush(Some(&Traversal::new())).await.unwrap();

    let id = edge.read().id().cloned().unwrap();
    assert!(edge.read().dirty().is_none());
    assert!(session
        .current(ElementRole::Edge, &id)
        .unwrap()
        .ptr_eq(&ElementRef::Edge(edge.clone())));
    let graph = client.graph_read().await;
    assert_eq!(graph.edge_count(), 1);
    assert_eq!(graph.edge_value(&id, DIRTY), None);
    assert_eq!(graph.edge_value(&id, "since"), Some(PropertyValue::Integer(2019)));
}
