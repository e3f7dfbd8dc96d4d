// tests/promotion.rs
//
// Moderation + promotion flows against the in-memory repository, including the
// flag invariants after every step.

use chrono::{Duration, NaiveDate, Utc};
use listing_curator::moderation::{approve, delete, reject, ModeratorId};
use listing_curator::promotion::{banners, demote, promote, reorder, Direction};
use listing_curator::{
    BannerLocation, Lifecycle, ListingItem, ListingType, MemoryRepository, Repository,
    WorkflowError,
};

fn m() -> ModeratorId {
    ModeratorId::new("moderator-7").unwrap()
}

fn insert(repo: &MemoryRepository, title: &str, offset_s: i64) -> String {
    let it = ListingItem::pending(
        ListingType::Contest,
        title.into(),
        format!("https://board.example.com/{title}"),
        NaiveDate::from_ymd_opt(2026, 4, 30).unwrap(),
        "contest-board".into(),
        Utc::now() + Duration::seconds(offset_s),
    );
    let id = it.id.clone();
    repo.insert_item(it).unwrap();
    id
}

fn published(repo: &MemoryRepository, title: &str, offset_s: i64) -> String {
    let id = insert(repo, title, offset_s);
    approve(repo, &id, &m(), Utc::now()).unwrap();
    id
}

fn titles(v: &[ListingItem]) -> Vec<String> {
    v.iter().map(|i| i.title.clone()).collect()
}

fn assert_invariants(repo: &MemoryRepository) {
    for it in repo.list_items().unwrap() {
        assert!(!it.is_active || it.is_approved, "{}: active ⇒ approved", it.title);
        assert!(
            !it.show_as_banner || (it.is_approved && it.is_active),
            "{}: banner ⇒ published",
            it.title
        );
        assert!(Lifecycle::from_flags(&it).is_ok());
    }
}

#[test]
fn promote_appends_and_reorder_swaps_neighbours() {
    let repo = MemoryRepository::new();
    let i1 = published(&repo, "I1", 1);
    let i2 = published(&repo, "I2", 2);
    let i3 = published(&repo, "I3", 3);

    for (id, want) in [(&i1, 1), (&i2, 2), (&i3, 3)] {
        let it = promote(&repo, id, BannerLocation::Both, &m()).unwrap();
        assert_eq!(it.banner_priority, want);
    }
    assert_eq!(titles(&banners(&repo, None).unwrap()), ["I1", "I2", "I3"]);

    reorder(&repo, &i3, Direction::Up, &m()).unwrap();
    assert_eq!(titles(&banners(&repo, None).unwrap()), ["I1", "I3", "I2"]);

    // boundaries are no-ops
    reorder(&repo, &i1, Direction::Up, &m()).unwrap();
    reorder(&repo, &i2, Direction::Down, &m()).unwrap();
    assert_eq!(titles(&banners(&repo, None).unwrap()), ["I1", "I3", "I2"]);

    reorder(&repo, &i1, Direction::Down, &m()).unwrap();
    assert_eq!(titles(&banners(&repo, None).unwrap()), ["I3", "I1", "I2"]);
    assert_invariants(&repo);
}

#[test]
fn location_filter_treats_both_as_member_of_each_page() {
    let repo = MemoryRepository::new();
    let d = published(&repo, "disc", 1);
    let r = published(&repo, "recr", 2);
    let b = published(&repo, "both", 3);
    promote(&repo, &d, BannerLocation::Discover, &m()).unwrap();
    promote(&repo, &r, BannerLocation::Recruit, &m()).unwrap();
    promote(&repo, &b, BannerLocation::Both, &m()).unwrap();

    assert_eq!(
        titles(&banners(&repo, Some(BannerLocation::Discover)).unwrap()),
        ["disc", "both"]
    );
    assert_eq!(
        titles(&banners(&repo, Some(BannerLocation::Recruit)).unwrap()),
        ["recr", "both"]
    );
    assert_eq!(banners(&repo, None).unwrap().len(), 3);
}

#[test]
fn reorder_only_considers_banners_visible_together() {
    let repo = MemoryRepository::new();
    let d1 = published(&repo, "d1", 1);
    let r1 = published(&repo, "r1", 2);
    let d2 = published(&repo, "d2", 3);
    promote(&repo, &d1, BannerLocation::Discover, &m()).unwrap();
    promote(&repo, &r1, BannerLocation::Recruit, &m()).unwrap();
    promote(&repo, &d2, BannerLocation::Discover, &m()).unwrap();

    reorder(&repo, &d2, Direction::Up, &m()).unwrap();
    assert_eq!(
        titles(&banners(&repo, Some(BannerLocation::Discover)).unwrap()),
        ["d2", "d1"]
    );
    let recr = repo.get_item(&r1).unwrap().unwrap();
    assert_eq!(recr.banner_priority, 1, "recruit-only banner untouched");
}

#[test]
fn new_banner_priority_counts_only_banners_shown_with_it() {
    let repo = MemoryRepository::new();
    let d1 = published(&repo, "d1", 1);
    let d2 = published(&repo, "d2", 2);
    let r1 = published(&repo, "r1", 3);
    let b1 = published(&repo, "b1", 4);
    promote(&repo, &d1, BannerLocation::Discover, &m()).unwrap();
    promote(&repo, &d2, BannerLocation::Discover, &m()).unwrap();

    let first_recruit = promote(&repo, &r1, BannerLocation::Recruit, &m()).unwrap();
    assert_eq!(first_recruit.banner_priority, 1);

    // shown on both pages, so it goes after the longer discover order
    let both = promote(&repo, &b1, BannerLocation::Both, &m()).unwrap();
    assert_eq!(both.banner_priority, 3);
    assert_eq!(
        titles(&banners(&repo, Some(BannerLocation::Recruit)).unwrap()),
        ["r1", "b1"]
    );
    assert_eq!(
        titles(&banners(&repo, Some(BannerLocation::Discover)).unwrap()),
        ["d1", "d2", "b1"]
    );
    assert_invariants(&repo);
}

#[test]
fn equal_priorities_fall_back_to_crawl_time() {
    let repo = MemoryRepository::new();
    let late = published(&repo, "late", 10);
    let early = published(&repo, "early", 1);
    for id in [&late, &early] {
        promote(&repo, id, BannerLocation::Both, &m()).unwrap();
        let mut row = repo.get_item(id).unwrap().unwrap();
        row.banner_priority = 5;
        repo.update_item(&row).unwrap();
    }
    assert_eq!(titles(&banners(&repo, None).unwrap()), ["early", "late"]);
}

#[test]
fn demote_keeps_item_published_and_frees_the_slot() {
    let repo = MemoryRepository::new();
    let a = published(&repo, "a", 1);
    promote(&repo, &a, BannerLocation::Recruit, &m()).unwrap();
    let it = demote(&repo, &a, &m()).unwrap();
    assert!(it.is_published());
    assert!(!it.show_as_banner && it.banner_location.is_none());
    assert!(banners(&repo, None).unwrap().is_empty());

    // promoting again appends after the current maximum (none left)
    let again = promote(&repo, &a, BannerLocation::Both, &m()).unwrap();
    assert_eq!(again.banner_priority, 1);
    assert_invariants(&repo);
}

#[test]
fn transitions_outside_the_lifecycle_are_refused() {
    let repo = MemoryRepository::new();
    let p = insert(&repo, "pending", 1);
    let a = published(&repo, "approved", 2);

    assert!(matches!(
        promote(&repo, &p, BannerLocation::Both, &m()),
        Err(WorkflowError::InvalidTransition { action: "promote", .. })
    ));
    assert!(matches!(
        demote(&repo, &p, &m()),
        Err(WorkflowError::InvalidTransition { .. })
    ));
    assert!(matches!(
        reorder(&repo, &a, Direction::Up, &m()),
        Err(WorkflowError::InvalidTransition { action: "reorder", .. })
    ));
    assert!(matches!(
        reject(&repo, &a, &m()),
        Err(WorkflowError::InvalidTransition { action: "reject", .. })
    ));
    assert!(matches!(
        promote(&repo, "missing", BannerLocation::Both, &m()),
        Err(WorkflowError::NotFound(_))
    ));
    assert_invariants(&repo);
}

#[test]
fn inconsistent_rows_are_not_acted_on_but_can_be_deleted() {
    let repo = MemoryRepository::new();
    let id = insert(&repo, "broken", 1);
    let mut row = repo.get_item(&id).unwrap().unwrap();
    row.show_as_banner = true;
    repo.update_item(&row).unwrap();

    assert!(matches!(
        approve(&repo, &id, &m(), Utc::now()),
        Err(WorkflowError::Inconsistent(_))
    ));
    assert!(banners(&repo, None).unwrap().is_empty());
    delete(&repo, &id, &m()).unwrap();
    assert!(repo.get_item(&id).unwrap().is_none());
}

#[test]
fn reject_then_lookup_is_not_found() {
    let repo = MemoryRepository::new();
    let id = insert(&repo, "spam", 1);
    reject(&repo, &id, &m()).unwrap();
    assert!(repo.get_item(&id).unwrap().is_none());
    assert!(matches!(
        approve(&repo, &id, &m(), Utc::now()),
        Err(WorkflowError::NotFound(_))
    ));
}
