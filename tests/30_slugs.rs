mod common;

use anyhow::Result;
use atelier_api::content::{ContentPatch, NewContent, NewLesson, NewModule, ARTICLES};

fn article(title: &str) -> NewContent {
    NewContent {
        title: title.to_string(),
        summary: None,
        body: Some("body".to_string()),
        is_paid: false,
        published: true,
        tags: None,
    }
}

fn course(title: &str) -> NewContent {
    NewContent {
        title: title.to_string(),
        summary: None,
        body: None,
        is_paid: false,
        published: true,
        tags: None,
    }
}

#[tokio::test]
async fn allocation_is_deterministic_with_suffix_probing() -> Result<()> {
    let backend = common::backend().await;
    let mut slugs = Vec::new();
    for _ in 0..3 {
        let created = backend
            .content
            .create(ARTICLES, &backend.author, article("Hello, World!"))
            .await?;
        slugs.push(created["slug"].as_str().unwrap().to_string());
    }
    assert_eq!(slugs, ["hello-world", "hello-world-1", "hello-world-2"]);
    Ok(())
}

#[tokio::test]
async fn module_slugs_are_scoped_to_their_course() -> Result<()> {
    let backend = common::backend().await;
    let course_a = backend
        .content
        .create(atelier_api::content::COURSES, &backend.author, course("Course A"))
        .await?;
    let course_b = backend
        .content
        .create(atelier_api::content::COURSES, &backend.author, course("Course B"))
        .await?;

    let module_a = backend
        .content
        .create_module(
            &backend.author,
            common::id_of(&course_a),
            NewModule {
                title: "Intro".to_string(),
                position: 0,
            },
        )
        .await?;
    let module_b = backend
        .content
        .create_module(
            &backend.author,
            common::id_of(&course_b),
            NewModule {
                title: "Intro".to_string(),
                position: 0,
            },
        )
        .await?;

    // parallel namespaces do not collide
    assert_eq!(module_a["slug"], "intro");
    assert_eq!(module_b["slug"], "intro");
    Ok(())
}

#[tokio::test]
async fn lesson_slugs_are_scoped_to_their_module() -> Result<()> {
    let backend = common::backend().await;
    let course_row = backend
        .content
        .create(atelier_api::content::COURSES, &backend.author, course("Rust 101"))
        .await?;
    let module_row = backend
        .content
        .create_module(
            &backend.author,
            common::id_of(&course_row),
            NewModule {
                title: "Basics".to_string(),
                position: 0,
            },
        )
        .await?;

    let lesson = |title: &str| NewLesson {
        title: title.to_string(),
        body: None,
        is_paid: false,
        published: true,
        position: 0,
        tags: None,
    };

    let first = backend
        .content
        .create_lesson(&backend.author, common::id_of(&module_row), lesson("Ownership"))
        .await?;
    let second = backend
        .content
        .create_lesson(&backend.author, common::id_of(&module_row), lesson("Ownership"))
        .await?;

    assert_eq!(first["slug"], "ownership");
    assert_eq!(second["slug"], "ownership-1");
    Ok(())
}

#[tokio::test]
async fn updates_never_regenerate_the_slug() -> Result<()> {
    let backend = common::backend().await;
    let created = backend
        .content
        .create(ARTICLES, &backend.author, article("First Post"))
        .await?;
    let id = common::id_of(&created);
    assert_eq!(created["slug"], "first-post");

    let updated = backend
        .content
        .update(
            ARTICLES,
            &backend.author,
            id,
            ContentPatch {
                title: Some("Entirely New Title".to_string()),
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(updated["title"], "Entirely New Title");
    assert_eq!(updated["slug"], "first-post");
    Ok(())
}

#[tokio::test]
async fn punctuation_only_titles_fall_back_to_a_fixed_token() -> Result<()> {
    let backend = common::backend().await;
    let created = backend
        .content
        .create(ARTICLES, &backend.author, article("!!!"))
        .await?;
    assert_eq!(created["slug"], "untitled");
    Ok(())
}
