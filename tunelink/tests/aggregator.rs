use tunelink::{
    test::{self, ManualClock, ScriptedProvider},
    CatalogEntity, ContentLink, EntityKind, ErrorKind, Platform, ResultSet, SearchError,
    SearchQuery,
};

fn results_with_track(id: &str, title: &str) -> ResultSet {
    ResultSet {
        tracks: vec![test::track(id, title, "artist")],
        ..Default::default()
    }
}

#[tokio::test]
async fn primary_success_skips_secondary() {
    let primary = ScriptedProvider::new().with_search_results(results_with_track("p1", "primary"));
    let secondary =
        ScriptedProvider::new().with_search_results(results_with_track("s1", "secondary"));
    let ctx = test::create_context_with_providers(&primary, &secondary, &ManualClock::default());

    let results = ctx.search().search(&SearchQuery::new("query")).await.unwrap();
    assert_eq!(results.tracks[0].title, "primary");
    assert_eq!(primary.search_calls(), 1);
    assert_eq!(secondary.search_calls(), 0);
}

#[tokio::test]
async fn primary_failure_falls_back() {
    let primary = ScriptedProvider::failing();
    let secondary =
        ScriptedProvider::new().with_search_results(results_with_track("s1", "secondary"));
    let ctx = test::create_context_with_providers(&primary, &secondary, &ManualClock::default());

    let results = ctx.search().search(&SearchQuery::new("query")).await.unwrap();
    assert_eq!(results.tracks[0].title, "secondary");
    assert_eq!(primary.search_calls(), 1);
    assert_eq!(secondary.search_calls(), 1);
}

#[tokio::test]
async fn empty_results_are_not_failures() {
    let primary = ScriptedProvider::new();
    let secondary =
        ScriptedProvider::new().with_search_results(results_with_track("s1", "secondary"));
    let ctx = test::create_context_with_providers(&primary, &secondary, &ManualClock::default());

    let results = ctx.search().search(&SearchQuery::new("nothing")).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(secondary.search_calls(), 0);
}

#[tokio::test]
async fn all_providers_failed_carries_every_error() {
    let primary = ScriptedProvider::failing();
    let secondary = ScriptedProvider::failing();
    let ctx = test::create_context_with_providers(&primary, &secondary, &ManualClock::default());

    let err = ctx
        .search()
        .search(&SearchQuery::new("query"))
        .await
        .unwrap_err();
    let failures = match err {
        SearchError::AllProvidersFailed(err) => err.into_failures(),
        other => panic!("unexpected error: {other:?}"),
    };
    let names = failures
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["primary", "secondary"]);
    assert!(failures
        .iter()
        .all(|(_, err)| err.kind() == ErrorKind::Internal));
}

#[tokio::test]
async fn priority_decides_order_not_registration() {
    let low = ScriptedProvider::new().with_search_results(results_with_track("l", "low"));
    let high = ScriptedProvider::new().with_search_results(results_with_track("h", "high"));
    let mut config = test::create_config_memory();
    config.register_provider(5, "registered-first", low.clone()).unwrap();
    config.register_provider(1, "registered-second", high.clone()).unwrap();
    let ctx = test::create_context(config);

    assert_eq!(
        ctx.search().providers().collect::<Vec<_>>(),
        vec!["registered-second", "registered-first"]
    );
    let results = ctx.search().search(&SearchQuery::new("q")).await.unwrap();
    assert_eq!(results.tracks[0].title, "high");
    assert_eq!(low.search_calls(), 0);
}

#[tokio::test]
async fn query_kind_is_passed_through() {
    let primary = ScriptedProvider::new();
    let secondary = ScriptedProvider::new();
    let ctx = test::create_context_with_providers(&primary, &secondary, &ManualClock::default());

    let query = SearchQuery::new("scorpion").with_kind(EntityKind::Album);
    ctx.search().search(&query).await.unwrap();
    assert_eq!(primary.queries(), vec![query]);
}

#[tokio::test]
async fn newer_search_supersedes_older() {
    let primary = ScriptedProvider::new().with_search_results(results_with_track("p1", "primary"));
    let secondary = ScriptedProvider::failing();
    let ctx = test::create_context_with_providers(&primary, &secondary, &ManualClock::default());

    primary.set_delay(Some(std::time::Duration::from_secs(60)));
    let first = {
        let ctx = ctx.clone();
        tokio::spawn(async move { ctx.search().search(&SearchQuery::new("first")).await })
    };
    while primary.search_calls() == 0 {
        tokio::task::yield_now().await;
    }

    primary.set_delay(None);
    let second = ctx.search().search(&SearchQuery::new("second")).await;
    assert!(second.is_ok());

    let first = first.await.unwrap();
    assert!(matches!(first, Err(SearchError::Cancelled)));
    // the superseded search never reaches the fallback
    assert_eq!(secondary.search_calls(), 0);
}

#[tokio::test]
async fn close_cancels_active_search() {
    let primary = ScriptedProvider::new();
    let secondary = ScriptedProvider::new();
    let ctx = test::create_context_with_providers(&primary, &secondary, &ManualClock::default());

    primary.set_delay(Some(std::time::Duration::from_secs(60)));
    let active = {
        let ctx = ctx.clone();
        tokio::spawn(async move { ctx.search().search(&SearchQuery::new("q")).await })
    };
    while primary.search_calls() == 0 {
        tokio::task::yield_now().await;
    }
    ctx.search().close();

    assert!(matches!(active.await.unwrap(), Err(SearchError::Cancelled)));
    assert_eq!(secondary.search_calls(), 0);
}

#[tokio::test]
async fn resolve_tries_providers_in_order() {
    let link = ContentLink::new(Platform::Deezer, EntityKind::Track, "3135556");
    let entity = CatalogEntity::Track(test::track("3135556", "Harder, Better", "Daft Punk"));
    let primary = ScriptedProvider::new();
    let secondary = ScriptedProvider::new().with_entity(&link, entity.clone());
    let ctx = test::create_context_with_providers(&primary, &secondary, &ManualClock::default());

    let resolved = ctx
        .search()
        .resolve("https://www.deezer.com/en/track/3135556")
        .await
        .unwrap();
    assert_eq!(resolved, entity);
}

#[tokio::test]
async fn resolve_errors() {
    let primary = ScriptedProvider::failing();
    let secondary = ScriptedProvider::new();
    let ctx = test::create_context_with_providers(&primary, &secondary, &ManualClock::default());

    let err = ctx
        .search()
        .resolve("https://example.com/track/1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);

    let err = ctx
        .search()
        .resolve("spotify:track:6DCZcSspjsKoFjzjrWoCdn")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
