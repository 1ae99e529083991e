use sea_orm::{DatabaseConnection, DbErr, EntityTrait, QueryOrder};
use std::sync::Arc;
use tokio::sync::watch;

use crate::entities::{testimonial, Testimonial};

/// Latest-testimonial notification for the public home page. Writers call
/// `refresh` after touching the testimonials table; readers hold a receiver.
#[derive(Clone)]
pub struct TestimonialFeed {
    tx: Arc<watch::Sender<Option<testimonial::Model>>>,
}

impl TestimonialFeed {
    pub fn new(initial: Option<testimonial::Model>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub async fn load(db: &DatabaseConnection) -> Result<Self, DbErr> {
        Ok(Self::new(latest(db).await?))
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<testimonial::Model>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<testimonial::Model> {
        self.tx.borrow().clone()
    }

    /// Re-reads the newest row and notifies subscribers if it changed.
    /// A read that raced with a newer write never replaces the newer value;
    /// an older row only takes over once the shown one is gone from the table.
    pub async fn refresh(&self, db: &DatabaseConnection) -> Result<(), DbErr> {
        let newest = latest(db).await?;
        let shown = self.current();
        let shown_deleted = match &shown {
            Some(s) if !supersedes(Some(s), newest.as_ref()) => Testimonial::find_by_id(s.id).one(db).await?.is_none(),
            _ => false,
        };
        let deleted_id = shown.filter(|_| shown_deleted).map(|s| s.id);

        self.tx.send_if_modified(|current| {
            let current_deleted = current.as_ref().map(|c| c.id) == deleted_id && deleted_id.is_some();
            let replace = if current_deleted {
                *current != newest
            } else {
                supersedes(current.as_ref(), newest.as_ref())
            };
            if replace {
                *current = newest;
            }
            replace
        });
        Ok(())
    }
}

/// Whether `candidate` is strictly newer than `current`, ordering by creation
/// time and then id.
fn supersedes(current: Option<&testimonial::Model>, candidate: Option<&testimonial::Model>) -> bool {
    match (current, candidate) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(cur), Some(new)) => (new.created_at, new.id) > (cur.created_at, cur.id),
    }
}

pub async fn latest(db: &DatabaseConnection) -> Result<Option<testimonial::Model>, DbErr> {
    Testimonial::find()
        .order_by_desc(testimonial::Column::CreatedAt)
        .order_by_desc(testimonial::Column::Id)
        .one(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::now;
    use sea_orm::{ActiveModelTrait, Set};
    use uuid::Uuid;

    #[tokio::test]
    async fn refresh_notifies_subscribers_of_new_testimonial() {
        let (db, _dir) = crate::test_support::test_db().await;
        let feed = TestimonialFeed::load(&db).await.unwrap();
        let mut rx = feed.subscribe();
        assert!(rx.borrow_and_update().is_none());

        let saved = testimonial::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Dana".to_string()),
            message: Set("Rex loves his walks".to_string()),
            rating: Set(5),
            created_at: Set(now()),
        }
        .insert(&db)
        .await
        .unwrap();
        feed.refresh(&db).await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref().map(|t| t.id), Some(saved.id));

        // Nothing new: no spurious wakeup.
        feed.refresh(&db).await.unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    fn testimonial_at(minutes_ago: i64) -> testimonial::Model {
        testimonial::Model {
            id: Uuid::new_v4(),
            name: "Dana".to_string(),
            message: "Great walks".to_string(),
            rating: 5,
            created_at: now() - chrono::Duration::minutes(minutes_ago),
        }
    }

    async fn insert(db: &DatabaseConnection, row: testimonial::Model) -> testimonial::Model {
        testimonial::ActiveModel {
            id: Set(row.id),
            name: Set(row.name),
            message: Set(row.message),
            rating: Set(row.rating),
            created_at: Set(row.created_at),
        }
        .insert(db)
        .await
        .unwrap()
    }

    #[test]
    fn older_row_never_supersedes_newer_one() {
        let older = testimonial_at(10);
        let newer = testimonial_at(1);

        assert!(supersedes(Some(&older), Some(&newer)));
        assert!(!supersedes(Some(&newer), Some(&older)));
        assert!(!supersedes(Some(&newer), Some(&newer)));
        assert!(!supersedes(Some(&newer), None));
        assert!(supersedes(None, Some(&older)));
    }

    #[tokio::test]
    async fn deleting_shown_testimonial_falls_back_to_previous() {
        let (db, _dir) = crate::test_support::test_db().await;
        let older = insert(&db, testimonial_at(10)).await;
        let newer = insert(&db, testimonial_at(1)).await;
        let feed = TestimonialFeed::load(&db).await.unwrap();
        assert_eq!(feed.current().map(|t| t.id), Some(newer.id));

        Testimonial::delete_by_id(newer.id).exec(&db).await.unwrap();
        feed.refresh(&db).await.unwrap();
        assert_eq!(feed.current().map(|t| t.id), Some(older.id));

        Testimonial::delete_by_id(older.id).exec(&db).await.unwrap();
        feed.refresh(&db).await.unwrap();
        assert!(feed.current().is_none());
    }
}
