use crate::support::*;
use account_search::models::{AccountStatus, AccountSummary};
use account_search::search::{AdminFilter, SearchCriteriaBuilder, EMPTY_SEARCH};
use account_search::SearchCriteria;

fn account_ids(page: &account_search::PagedResult<AccountSummary>) -> Vec<String> {
    let mut out = ids(page, |a| a.id.as_str());
    out.sort();
    out
}

#[tokio::test]
async fn default_search_matches_every_account_in_tenant() -> anyhow::Result<()> {
    with_test_db(|db| {
        Box::pin(async move {
            seed_accounts(&db.pool, APP_ID, 3).await?;
            AccountBuilder::new(OTHER_APP_ID, "elsewhere")
                .insert(&db.pool)
                .await?;

            let page = db.executor.search(APP_ID, &EMPTY_SEARCH).await?;
            assert_eq!(page.total, 3);
            assert_eq!(
                ids(&page, |a| a.id.as_str()),
                vec!["acct-02", "acct-01", "acct-00"],
                "newest first"
            );
            assert!(page.items.iter().all(|a| a.app_id == APP_ID));
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn group_predicates_combine_conjunctively() -> anyhow::Result<()> {
    with_test_db(|db| {
        Box::pin(async move {
            AccountBuilder::new(APP_ID, "ab")
                .groups(&["A", "B"])
                .insert(&db.pool)
                .await?;
            AccountBuilder::new(APP_ID, "a")
                .groups(&["A"])
                .insert(&db.pool)
                .await?;
            AccountBuilder::new(APP_ID, "bc")
                .groups(&["B", "C"])
                .insert(&db.pool)
                .await?;

            let all_of = SearchCriteria::builder()
                .with_all_of_groups(["A", "B"])
                .build();
            let page = db.executor.search(APP_ID, &all_of).await?;
            assert_eq!(account_ids(&page), vec!["ab"]);
            assert_eq!(page.total, 1);

            let none_of = SearchCriteria::builder().with_none_of_groups(["C"]).build();
            let page = db.executor.search(APP_ID, &none_of).await?;
            assert_eq!(account_ids(&page), vec!["a", "ab"]);

            let both = SearchCriteria::builder()
                .with_all_of_groups(["B"])
                .with_none_of_groups(["C"])
                .build();
            let page = db.executor.search(APP_ID, &both).await?;
            assert_eq!(account_ids(&page), vec!["ab"]);
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn org_filter_precedence() -> anyhow::Result<()> {
    with_test_db(|db| {
        Box::pin(async move {
            AccountBuilder::new(APP_ID, "member1")
                .org("org1")
                .insert(&db.pool)
                .await?;
            AccountBuilder::new(APP_ID, "member2")
                .org("org2")
                .insert(&db.pool)
                .await?;
            AccountBuilder::new(APP_ID, "unassigned")
                .insert(&db.pool)
                .await?;

            let exclude_wins = SearchCriteria::builder()
                .with_exclude_org_members(true)
                .with_org_membership(Some("org1"))
                .build();
            let page = db.executor.search(APP_ID, &exclude_wins).await?;
            assert_eq!(account_ids(&page), vec!["unassigned"]);

            let org1 = SearchCriteria::builder()
                .with_org_membership(Some("org1"))
                .build();
            let page = db.executor.search(APP_ID, &org1).await?;
            assert_eq!(account_ids(&page), vec!["member1"]);

            let page = db.executor.search(APP_ID, &EMPTY_SEARCH).await?;
            assert_eq!(account_ids(&page), vec!["member1", "member2", "unassigned"]);
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn admin_filter_tri_state() -> anyhow::Result<()> {
    with_test_db(|db| {
        Box::pin(async move {
            AccountBuilder::new(APP_ID, "admin")
                .roles(&["developer", "researcher"])
                .insert(&db.pool)
                .await?;
            AccountBuilder::new(APP_ID, "participant")
                .insert(&db.pool)
                .await?;

            let search = |admin: AdminFilter| {
                SearchCriteria::builder().with_admin_only(admin).build()
            };

            let page = db.executor.search(APP_ID, &search(AdminFilter::Yes)).await?;
            assert_eq!(account_ids(&page), vec!["admin"]);

            let page = db.executor.search(APP_ID, &search(AdminFilter::No)).await?;
            assert_eq!(account_ids(&page), vec!["participant"]);

            let page = db.executor.search(APP_ID, &search(AdminFilter::Unset)).await?;
            assert_eq!(account_ids(&page), vec!["admin", "participant"]);
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn substring_language_status_and_date_filters() -> anyhow::Result<()> {
    with_test_db(|db| {
        Box::pin(async move {
            AccountBuilder::new(APP_ID, "alice")
                .email("Alice.Smith@Example.org")
                .phone("+1 (206) 547-1234")
                .languages(&["en", "fr"])
                .created_on(created_at(10))
                .insert(&db.pool)
                .await?;
            AccountBuilder::new(APP_ID, "bob")
                .email("bob_100%@example.org")
                .phone("+44 20 7946 0000")
                .languages(&["de"])
                .status(AccountStatus::Disabled)
                .created_on(created_at(20))
                .insert(&db.pool)
                .await?;

            let by_email = SearchCriteria::builder().with_email_filter("alice.smith").build();
            assert_eq!(
                account_ids(&db.executor.search(APP_ID, &by_email).await?),
                vec!["alice"]
            );

            // LIKE metacharacters in the filter match literally.
            let literal = SearchCriteria::builder().with_email_filter("_100%").build();
            assert_eq!(
                account_ids(&db.executor.search(APP_ID, &literal).await?),
                vec!["bob"]
            );
            let wildcard = SearchCriteria::builder().with_email_filter("%").build();
            assert_eq!(
                account_ids(&db.executor.search(APP_ID, &wildcard).await?),
                vec!["bob"]
            );

            let by_phone = SearchCriteria::builder().with_phone_filter("206-547").build();
            assert_eq!(
                account_ids(&db.executor.search(APP_ID, &by_phone).await?),
                vec!["alice"]
            );

            let by_language = SearchCriteria::builder().with_language("fr").build();
            assert_eq!(
                account_ids(&db.executor.search(APP_ID, &by_language).await?),
                vec!["alice"]
            );

            let by_status = SearchCriteria::builder()
                .with_status(AccountStatus::Disabled)
                .build();
            assert_eq!(
                account_ids(&db.executor.search(APP_ID, &by_status).await?),
                vec!["bob"]
            );

            // Both bounds are inclusive.
            let range = SearchCriteria::builder()
                .with_start_time(created_at(10))
                .with_end_time(created_at(15))
                .build();
            assert_eq!(
                account_ids(&db.executor.search(APP_ID, &range).await?),
                vec!["alice"]
            );
            let open_ended = SearchCriteria::builder()
                .with_start_time(created_at(11))
                .build();
            assert_eq!(
                account_ids(&db.executor.search(APP_ID, &open_ended).await?),
                vec!["bob"]
            );
            let upper_only = SearchCriteria::builder()
                .with_end_time(created_at(20))
                .build();
            assert_eq!(
                account_ids(&db.executor.search(APP_ID, &upper_only).await?),
                vec!["alice", "bob"]
            );
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn copied_criteria_returns_identical_results() -> anyhow::Result<()> {
    with_test_db(|db| {
        Box::pin(async move {
            AccountBuilder::new(APP_ID, "member")
                .org("org1")
                .groups(&["A"])
                .insert(&db.pool)
                .await?;
            AccountBuilder::new(APP_ID, "outsider")
                .groups(&["A"])
                .insert(&db.pool)
                .await?;

            let original = SearchCriteria::builder()
                .with_all_of_groups(["A"])
                .with_org_membership(Some("org1"))
                .build();
            let copy = SearchCriteriaBuilder::copy_of(&original).build();
            assert_eq!(copy, original);

            let a = db.executor.search(APP_ID, &original).await?;
            let b = db.executor.search(APP_ID, &copy).await?;
            assert_eq!(a, b);
            assert_eq!(account_ids(&b), vec!["member"]);
            Ok(())
        })
    })
    .await
}
