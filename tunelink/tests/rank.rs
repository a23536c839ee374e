use tunelink::{
    rank::{MAX_PRIORITY_ALBUMS, MAX_RANKED_ITEMS},
    test, EntityKind, RankedItem, ResultSet,
};

fn labels(items: &[RankedItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let explicit = if item.explicit { "(explicit)" } else { "" };
            let kind = match item.kind {
                EntityKind::Track => "Track",
                EntityKind::Album => "Album",
                EntityKind::Artist => "Artist",
                EntityKind::Playlist => "Playlist",
            };
            format!("{kind}:{}{explicit}", item.title)
        })
        .collect()
}

#[test]
fn artist_query_scenario() {
    let results = ResultSet {
        tracks: vec![
            test::track("t1", "God's Plan", "Drake"),
            test::explicit_track("t2", "God's Plan", "Drake"),
        ],
        albums: vec![
            test::album("al1", "Scorpion", "Drake"),
            test::album("al2", "Views", "Drake"),
            test::album("al3", "CTRL", "SZA"),
        ],
        artists: vec![test::artist("ar1", "Drake")],
        playlists: vec![test::playlist("pl1", "Drake Hits", "editorial")],
    };

    let ranked = tunelink::rank(&results, "Drake");
    assert_eq!(
        labels(&ranked),
        vec![
            "Artist:Drake",
            "Album:Scorpion",
            "Album:Views",
            "Track:God's Plan(explicit)",
            "Album:CTRL",
            "Playlist:Drake Hits",
        ]
    );
    assert_eq!(ranked[3].id.as_str(), "t2");
}

#[test]
fn matching_artist_precedes_everything_else() {
    let results = ResultSet {
        tracks: vec![test::track("t1", "Kill Bill", "SZA")],
        albums: vec![test::album("al1", "SOS", "SZA")],
        artists: vec![test::artist("ar0", "Drake"), test::artist("ar1", "SZA")],
        playlists: vec![test::playlist("pl1", "SZA Radio", "editorial")],
    };

    let ranked = tunelink::rank(&results, "  sza!! ");
    assert_eq!(ranked[0].title, "SZA");
    assert_eq!(ranked[0].kind, EntityKind::Artist);
    assert_eq!(ranked[1].title, "SOS");
    // non-matching artists come after every track and album
    assert_eq!(
        labels(&ranked),
        vec![
            "Artist:SZA",
            "Album:SOS",
            "Track:Kill Bill",
            "Artist:Drake",
            "Playlist:SZA Radio",
        ]
    );
}

#[test]
fn priority_albums_are_capped() {
    let albums = (0..5)
        .map(|i| test::album(&format!("al{i}"), &format!("Album {i}"), "Drake"))
        .collect::<Vec<_>>();
    let results = ResultSet {
        tracks: vec![test::track("t1", "Track", "Drake")],
        albums,
        artists: vec![test::artist("ar1", "Drake")],
        playlists: Vec::new(),
    };

    let ranked = tunelink::rank(&results, "drake");
    let track_position = ranked
        .iter()
        .position(|item| item.kind == EntityKind::Track)
        .unwrap();
    assert_eq!(track_position, 1 + MAX_PRIORITY_ALBUMS);
    assert_eq!(ranked.len(), 7);
    assert_eq!(ranked[5].title, "Album 3");
}

#[test]
fn output_is_capped() {
    let results = ResultSet {
        tracks: (0..40)
            .map(|i| test::track(&format!("t{i}"), &format!("Track {i}"), "Artist"))
            .collect(),
        albums: (0..20)
            .map(|i| test::album(&format!("al{i}"), &format!("Album {i}"), "Artist"))
            .collect(),
        artists: Vec::new(),
        playlists: (0..20)
            .map(|i| test::playlist(&format!("pl{i}"), &format!("Playlist {i}"), "owner"))
            .collect(),
    };

    assert_eq!(tunelink::rank(&results, "track").len(), MAX_RANKED_ITEMS);
    assert_eq!(tunelink::rank(&results, "").len(), MAX_RANKED_ITEMS);
}

#[test]
fn empty_query_uses_flat_order() {
    let results = ResultSet {
        tracks: vec![
            test::track("t1", "Song", "Drake"),
            test::explicit_track("t2", "Song", "Drake"),
        ],
        albums: vec![test::album("al1", "Scorpion", "Drake")],
        artists: vec![test::artist("ar1", "Drake")],
        playlists: vec![test::playlist("pl1", "Drake Hits", "editorial")],
    };

    for query in ["", "   ", "?!"] {
        let ranked = tunelink::rank(&results, query);
        assert_eq!(
            labels(&ranked),
            vec![
                "Track:Song(explicit)",
                "Album:Scorpion",
                "Artist:Drake",
                "Playlist:Drake Hits",
            ]
        );
    }
}

#[test]
fn short_artist_names_only_match_exactly() {
    let results = ResultSet {
        artists: vec![test::artist("ar1", "U2"), test::artist("ar2", "Dr")],
        ..Default::default()
    };

    let ranked = tunelink::rank(&results, "u2");
    assert_eq!(ranked[0].title, "U2");

    // "dr" is shorter than the partial match minimum
    let ranked = tunelink::rank(&results, "drake");
    assert_eq!(labels(&ranked), vec!["Artist:U2", "Artist:Dr"]);
}

#[test]
fn ranking_is_deterministic() {
    let results = ResultSet {
        tracks: (0..10)
            .map(|i| test::track(&format!("t{i}"), &format!("Song {}", i % 3), "Band"))
            .collect(),
        albums: vec![test::album("al1", "Record", "Band")],
        artists: vec![test::artist("ar1", "Band")],
        playlists: Vec::new(),
    };

    let first = tunelink::rank(&results, "band");
    let second = tunelink::rank(&results, "band");
    assert_eq!(first, second);
    assert_eq!(
        first
            .iter()
            .filter(|item| item.kind == EntityKind::Track)
            .count(),
        3
    );
}
