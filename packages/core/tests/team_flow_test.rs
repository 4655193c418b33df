//! End-to-end tests over the public crate API: tree shape guarantees,
//! legacy media decoding, and build behavior at depth.

use chrono::{Duration as ChronoDuration, Utc};
use sangam_core::{
    CreateMemberParams, DatabaseService, MediaAccess, MediaResolver, MemoryStore, TeamConfig,
    TeamNode, TeamService, TeamServiceError, TeamStore, TursoStore,
};
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

async fn create_service() -> (TeamService, Arc<TursoStore>, Arc<MemoryStore>) {
    init_tracing();

    let db = Arc::new(DatabaseService::new_in_memory().await.unwrap());
    let store = Arc::new(TursoStore::new(db));
    let objects = Arc::new(MemoryStore::default());

    let resolver = MediaResolver::new(objects.clone(), MediaAccess::PublicRead, 900);
    let service = TeamService::new(
        store.clone(),
        objects.clone(),
        resolver,
        TeamConfig::default(),
    );

    (service, store, objects)
}

/// Populate a uniform tree of the given depth and branching factor.
/// Returns the root id and the total number of nodes created.
async fn seed_uniform_tree(
    store: &Arc<TursoStore>,
    depth: usize,
    branching: usize,
) -> (String, usize) {
    let base = Utc::now();
    let root = store
        .upsert(TeamNode::new(Some("root".to_string()), None, None, None))
        .await
        .unwrap();

    let mut count = 1;
    let mut frontier = vec![root.id.clone()];

    for level in 0..depth {
        let mut next = Vec::new();
        for parent in &frontier {
            for i in 0..branching {
                let mut node = TeamNode::new(
                    Some(format!("L{}-{}", level, i)),
                    None,
                    None,
                    Some(parent.clone()),
                );
                node.created_at = base + ChronoDuration::microseconds((count * 10 + i) as i64);
                next.push(store.upsert(node).await.unwrap().id);
                count += 1;
            }
        }
        frontier = next;
    }

    (root.id, count)
}

#[tokio::test]
async fn test_build_returns_every_reachable_node() {
    let (service, store, _objects) = create_service().await;

    // depth 3, branching 3: 1 + 3 + 9 + 27 = 40 nodes
    let (root_id, seeded) = seed_uniform_tree(&store, 3, 3).await;
    assert_eq!(seeded, 40);

    let tree = service.build_tree(&root_id).await.unwrap();
    assert_eq!(tree.node_count(), seeded);

    // Sibling order holds at every level of the first spine
    let names: Vec<_> = tree
        .children
        .iter()
        .map(|c| c.name.clone().unwrap())
        .collect();
    assert_eq!(names, vec!["L0-0", "L0-1", "L0-2"]);
}

#[tokio::test]
async fn test_deep_chain_builds_without_depth_cap() {
    let (service, store, _objects) = create_service().await;

    let mut parent: Option<String> = None;
    let mut first = None;
    for _ in 0..40 {
        let node = store
            .upsert(TeamNode::new(None, None, None, parent.clone()))
            .await
            .unwrap();
        if first.is_none() {
            first = Some(node.id.clone());
        }
        parent = Some(node.id);
    }

    let tree = service.build_tree(first.as_deref().unwrap()).await.unwrap();
    assert_eq!(tree.node_count(), 40);
}

#[tokio::test]
async fn test_legacy_media_rows_resolve_best_effort() {
    let (service, store, _objects) = create_service().await;
    let conn = store.database().connect_with_timeout().await.unwrap();

    // Root with canonical media, children carrying every legacy form
    conn.execute(
        "INSERT INTO team_nodes (id, name, media_refs, created_at, modified_at) VALUES
         ('root', 'r', '[\"team_profiles/ok.jpg\"]',
          '2024-01-01T00:00:00.000000Z', '2024-01-01T00:00:00.000000Z')",
        (),
    )
    .await
    .unwrap();

    conn.execute(
        "INSERT INTO team_nodes (id, name, parent_id, media_refs, created_at, modified_at) VALUES
         ('c-path', 'path', 'root', 'team_profiles/legacy.jpg',
          '2024-01-01T00:00:01.000000Z', '2024-01-01T00:00:01.000000Z'),
         ('c-b64', 'b64', 'root', 'dGVhbV9wcm9maWxlcy9lbmMuanBn',
          '2024-01-01T00:00:02.000000Z', '2024-01-01T00:00:02.000000Z'),
         ('c-junk', 'junk', 'root', 'not base64!!',
          '2024-01-01T00:00:03.000000Z', '2024-01-01T00:00:03.000000Z')",
        (),
    )
    .await
    .unwrap();

    conn.execute(
        "INSERT INTO team_nodes (id, name, parent_id, media_refs, created_at, modified_at)
         VALUES ('c-blob', 'blob', 'root', ?,
                 '2024-01-01T00:00:04.000000Z', '2024-01-01T00:00:04.000000Z')",
        [libsql::Value::Blob(b"team_profiles/frombytes.jpg".to_vec())],
    )
    .await
    .unwrap();

    let tree = service.build_tree("root").await.unwrap();

    // Malformed legacy data degrades per-node; the tree itself is intact
    assert_eq!(tree.children.len(), 4);
    assert_eq!(tree.display_media.len(), 1);

    let by_name = |name: &str| {
        tree.children
            .iter()
            .find(|c| c.name.as_deref() == Some(name))
            .unwrap()
    };

    assert!(by_name("path").display_media[0].contains("team_profiles/legacy.jpg"));
    // base64 of "team_profiles/enc.jpg"
    assert!(by_name("b64").display_media[0].contains("team_profiles/enc.jpg"));
    assert!(by_name("blob").display_media[0].contains("team_profiles/frombytes.jpg"));

    // Unrecognizable data yields the placeholder, never an error
    let junk = by_name("junk");
    assert!(junk.display_media.is_empty());
    assert_eq!(junk.primary_media, "/defaults/avatar.png");
}

#[tokio::test]
async fn test_tree_response_wire_shape() {
    let (service, _store, _objects) = create_service().await;

    let root_id = service
        .create_member(
            CreateMemberParams {
                name: Some("Shape".to_string()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    let tree = service.build_tree(&root_id).await.unwrap();
    let json = serde_json::to_value(&tree).unwrap();

    for field in [
        "id",
        "name",
        "role",
        "samiti",
        "parentId",
        "displayMedia",
        "primaryMedia",
        "createdAt",
        "children",
    ] {
        assert!(json.get(field).is_some(), "missing field {}", field);
    }

    // Empty collections serialize as [] rather than null
    assert!(json["children"].as_array().unwrap().is_empty());
    assert!(json["displayMedia"].as_array().unwrap().is_empty());
}

/// Store whose lookups hang long enough to trip any reasonable build bound.
struct StalledStore;

#[async_trait::async_trait]
impl TeamStore for StalledStore {
    async fn find_by_id(&self, _id: &str) -> anyhow::Result<Option<TeamNode>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(None)
    }

    async fn find_children(&self, _parent_id: &str) -> anyhow::Result<Vec<TeamNode>> {
        Ok(Vec::new())
    }

    async fn upsert(&self, node: TeamNode) -> anyhow::Result<TeamNode> {
        Ok(node)
    }

    async fn update_fields(
        &self,
        _id: &str,
        _update: sangam_core::TeamNodeUpdate,
    ) -> anyhow::Result<Option<TeamNode>> {
        Ok(None)
    }

    async fn detach(&self, _id: &str) -> anyhow::Result<Option<TeamNode>> {
        Ok(None)
    }
}

#[tokio::test]
async fn test_build_timeout_bounds_latency() {
    init_tracing();

    let store = Arc::new(StalledStore);
    let objects = Arc::new(MemoryStore::default());
    let resolver = MediaResolver::new(objects.clone(), MediaAccess::PublicRead, 900);

    let config = TeamConfig {
        build_timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let service = TeamService::new(store, objects, resolver, config);

    let result = service.build_tree("any-root").await;
    assert!(matches!(result, Err(TeamServiceError::BuildTimeout { .. })));
}
