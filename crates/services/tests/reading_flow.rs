use std::sync::Arc;

use folio_core::model::{Book, BookId, Chapter, ChapterId, ChapterStatus, ScrollSample, UserId};
use folio_core::shelf::Shelf;
use folio_core::time::fixed_now;
use services::{AppServices, Clock, ServiceError, SessionHandle, ThrottleConfig};
use storage::repository::Storage;

fn serial_book() -> Book {
    Book::new(
        BookId::new(1),
        "Serial",
        vec![
            Chapter::published(1),
            Chapter::published(2),
            Chapter::draft(3),
        ],
    )
}

#[tokio::test]
async fn reading_flow_against_sqlite() {
    let user = UserId::new(1);
    let session = SessionHandle::signed_in(user);
    let app = AppServices::new_sqlite(
        "sqlite:file:memdb_reading_flow?mode=memory&cache=shared",
        Clock::fixed(fixed_now()),
        Arc::new(session.clone()),
        ThrottleConfig::default(),
    )
    .await
    .expect("connect sqlite");
    let progress = app.progress();
    let library = app.library();
    let mut book = serial_book();

    library.add_book(user, book.id()).await.unwrap();
    let shelves = library.shelves(user).await.unwrap();
    assert_eq!(shelves.shelf_of(book.id()), Some(Shelf::ToRead));

    let saved = progress
        .save_progress(user, &book, ScrollSample::new(0, 500.0, 1000.0))
        .await
        .unwrap();
    assert_eq!(saved.chapter_progress(ChapterId::new(1)), 50.0);
    assert_eq!(saved.overall_progress(), 25);

    progress
        .save_progress(user, &book, ScrollSample::new(0, 0.0, 0.0))
        .await
        .unwrap();
    progress
        .save_progress(user, &book, ScrollSample::new(1, 500.0, 1000.0))
        .await
        .unwrap();
    let stored = progress
        .get_progress_for_book(user, book.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.overall_progress(), 75);
    assert_eq!(
        library.shelves(user).await.unwrap().shelf_of(book.id()),
        Some(Shelf::Reading)
    );

    // Unpublishing the finished chapter takes it out of the average on the next save.
    book.chapters_mut()[0].set_status(ChapterStatus::Draft);
    let resaved = progress
        .save_progress(user, &book, ScrollSample::new(1, 100.0, 1000.0))
        .await
        .unwrap();
    assert_eq!(resaved.overall_progress(), 50);

    assert_eq!(library.stats(user).await.unwrap().chapters_read, 1);

    progress.clear_progress(user, book.id()).await.unwrap();
    assert!(
        progress
            .get_progress_for_book(user, book.id())
            .await
            .unwrap()
            .is_none()
    );
    assert!(progress.get_all_progress(user).await.unwrap().is_empty());

    session.sign_out();
    let err = progress.get_all_progress(user).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized));
}

#[tokio::test]
async fn throttled_writer_flushes_on_hide() {
    let user = UserId::new(2);
    let storage = Storage::in_memory();
    let app = AppServices::new(
        &storage,
        Clock::fixed(fixed_now()),
        Arc::new(SessionHandle::signed_in(user)),
        ThrottleConfig {
            interval: std::time::Duration::from_secs(60),
        },
    );
    let writer = app.writer();
    let book = Arc::new(serial_book());

    for scroll in [120.0, 480.0, 910.0] {
        writer.submit(user, Arc::clone(&book), ScrollSample::new(1, scroll, 1000.0));
    }
    assert!(writer.has_pending());
    writer.flush().await.unwrap();

    let stored = app
        .progress()
        .get_progress_for_book(user, book.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.last_read_chapter_index(), 1);
    assert_eq!(stored.last_read_scroll_position(), 910);
    assert_eq!(stored.chapter_progress(ChapterId::new(2)), 91.0);
}
