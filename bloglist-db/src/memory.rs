use crate::repository::{IdSource, Repository, RepositoryError, Result};
use async_trait::async_trait;
use bloglist_common::{
    model::{
        Id,
        post::{CreatePost, Post, PostMarker},
        user::{CreateUser, User, UserMarker, Username},
    },
    snowflake::{ProcessId, WorkerId},
};
use std::{
    collections::{BTreeMap, btree_map::Entry},
    sync::{Mutex, MutexGuard, PoisonError},
};
use tracing::trace;

#[derive(Debug, Default)]
struct Store {
    users: BTreeMap<Id<UserMarker>, User>,
    posts: BTreeMap<Id<PostMarker>, Post>,
    /// Post ids in the order they were first stored.
    post_order: Vec<Id<PostMarker>>,
}

/// Process-local repository. Contents are lost on shutdown; used when no database is
/// configured and by the test suites.
#[derive(Debug)]
pub struct MemoryRepository {
    store: Mutex<Store>,
    ids: IdSource,
}

impl MemoryRepository {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            store: Mutex::default(),
            ids: IdSource::new(worker_id, process_id),
        }
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert_post(&self, post: Post) -> Result<Post> {
        let mut store = self.store();
        if !store.users.contains_key(&post.user) {
            return Err(RepositoryError::MissingUser(post.user));
        }

        let Entry::Vacant(entry) = store.posts.entry(post.id) else {
            return Err(RepositoryError::DuplicatePostId(post.id));
        };
        entry.insert(post.clone());
        store.post_order.push(post.id);
        trace!(post_id = %post.id, "Inserted post");

        Ok(post)
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new(WorkerId::default(), ProcessId::default())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_user_by_id(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        Ok(self.store().users.get(&user_id).cloned())
    }

    async fn find_user_by_username(&self, username: &Username) -> Result<Option<User>> {
        Ok(self
            .store()
            .users
            .values()
            .find(|user| &user.username == username)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.store().users.values().cloned().collect())
    }

    async fn create_user(&self, user: CreateUser) -> Result<User> {
        let user_id = self.ids.next()?;
        let mut store = self.store();

        if store.users.values().any(|existing| existing.username == user.username) {
            return Err(RepositoryError::DuplicateUsername(user.username));
        }

        let user = User {
            id: user_id,
            username: user.username,
            name: user.name,
            password_hash: user.password_hash,
            blogs: Vec::new(),
        };
        store.users.insert(user_id, user.clone());
        trace!(%user_id, "Stored user");

        Ok(user)
    }

    async fn append_user_post(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<()> {
        let mut store = self.store();
        let user = store
            .users
            .get_mut(&user_id)
            .ok_or(RepositoryError::MissingUser(user_id))?;

        if !user.blogs.contains(&post_id) {
            user.blogs.push(post_id);
        }
        Ok(())
    }

    async fn remove_user_post(
        &self,
        user_id: Id<UserMarker>,
        post_id: Id<PostMarker>,
    ) -> Result<()> {
        if let Some(user) = self.store().users.get_mut(&user_id) {
            user.blogs.retain(|owned| *owned != post_id);
        }
        Ok(())
    }

    async fn find_post_by_id(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        Ok(self.store().posts.get(&post_id).cloned())
    }

    async fn list_posts(&self) -> Result<Vec<Post>> {
        let store = self.store();
        Ok(store
            .post_order
            .iter()
            .filter_map(|post_id| store.posts.get(post_id).cloned())
            .collect())
    }

    async fn create_post(&self, post: CreatePost) -> Result<Post> {
        self.insert_post(post.into_post(self.ids.next()?))
    }

    async fn save_post(&self, post: Post) -> Result<Post> {
        {
            let mut store = self.store();
            if let Some(stored) = store.posts.get_mut(&post.id) {
                let user = stored.user;
                *stored = Post { user, ..post };
                trace!(post_id = %stored.id, "Updated post");
                return Ok(stored.clone());
            }
        }

        self.insert_post(post)
    }

    async fn delete_post_by_id(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let mut store = self.store();
        if store.posts.remove(&post_id).is_none() {
            return Ok(false);
        }

        store.post_order.retain(|stored| *stored != post_id);
        Ok(true)
    }
}
