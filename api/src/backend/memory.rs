use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use uuid::Uuid;

use super::{
    AnswerRow, Backend, BackendError, Bucket, InteractionRow, NewAnswerRow, NewPostRow,
    ObjectUpload, PostFilter, PostPatch, PostRefRow, PostRow, Procedure, ProfilePatch, ProfileRow,
    Target, UserAnswerRow,
};
use crate::models::InteractionKind;

#[derive(Debug, Clone)]
struct Stored<T> {
    row: T,
    // Insertion order breaks created_at ties.
    seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Outcome of applying a vote on top of whatever the user recorded before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteChange {
    pub next: Option<InteractionKind>,
    pub likes: i64,
    pub dislikes: i64,
}

impl VoteChange {
    /// Repeating a vote withdraws it, switching moves it; a pair never counts twice.
    pub fn resolve(previous: Option<InteractionKind>, requested: InteractionKind) -> Self {
        use InteractionKind::*;
        match (previous, requested) {
            (None, Like) => Self { next: Some(Like), likes: 1, dislikes: 0 },
            (None, Dislike) => Self { next: Some(Dislike), likes: 0, dislikes: 1 },
            (Some(Like), Like) => Self { next: None, likes: -1, dislikes: 0 },
            (Some(Dislike), Dislike) => Self { next: None, likes: 0, dislikes: -1 },
            (Some(Dislike), Like) => Self { next: Some(Like), likes: 1, dislikes: -1 },
            (Some(Like), Dislike) => Self { next: Some(Dislike), likes: -1, dislikes: 1 },
        }
    }
}

/// In-process stand-in for the hosted backend.
///
/// Tables live in `DashMap`s. Counter procedures hold the target row's shard lock while
/// reading and writing the vote table, so concurrent votes on one target serialize.
pub struct MemoryBackend {
    posts: DashMap<Uuid, Stored<PostRow>>,
    answers: DashMap<Uuid, Stored<AnswerRow>>,
    profiles: DashMap<Uuid, ProfileRow>,
    post_votes: DashMap<(Uuid, Uuid), InteractionKind>, // (user, post)
    answer_votes: DashMap<(Uuid, Uuid), InteractionKind>, // (user, answer)
    objects: DashMap<(Bucket, String), StoredObject>,
    public_base: String,
    seq: AtomicU64,
    mutations: AtomicUsize,
}

impl MemoryBackend {
    pub fn new(public_base: impl Into<String>) -> Self {
        Self {
            posts: DashMap::new(),
            answers: DashMap::new(),
            profiles: DashMap::new(),
            post_votes: DashMap::new(),
            answer_votes: DashMap::new(),
            objects: DashMap::new(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
            seq: AtomicU64::new(0),
            mutations: AtomicUsize::new(0),
        }
    }

    /// Number of write operations (inserts, updates, deletes, RPCs, uploads) served so far.
    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    pub fn object(&self, bucket: Bucket, path: &str) -> Option<StoredObject> {
        self.objects
            .get(&(bucket, path.to_string()))
            .map(|o| o.clone())
    }

    pub fn post_vote(&self, user_id: Uuid, post_id: Uuid) -> Option<InteractionKind> {
        self.post_votes.get(&(user_id, post_id)).map(|v| *v)
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    fn record_mutation(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }

    fn answers_for(&self, post_id: Uuid) -> Vec<AnswerRow> {
        let mut answers: Vec<Stored<AnswerRow>> = self
            .answers
            .iter()
            .filter(|a| a.row.post_id == post_id)
            .map(|a| a.value().clone())
            .collect();
        answers.sort_by_key(|a| (a.row.created_at, a.seq));
        answers.into_iter().map(|a| a.row).collect()
    }

    fn with_answers(&self, mut row: PostRow) -> PostRow {
        row.answers = self.answers_for(row.id);
        row
    }

    fn vote_post(&self, post_id: Uuid, user_id: Uuid, kind: InteractionKind) -> Result<(), BackendError> {
        let mut post = self
            .posts
            .get_mut(&post_id)
            .ok_or(BackendError::Missing("post"))?;

        let key = (user_id, post_id);
        let previous = self.post_votes.get(&key).map(|v| *v);
        let change = VoteChange::resolve(previous, kind);

        match change.next {
            Some(next) => self.post_votes.insert(key, next),
            None => self.post_votes.remove(&key).map(|(_, v)| v),
        };
        post.row.likes += change.likes;
        post.row.dislikes += change.dislikes;

        Ok(())
    }

    fn vote_answer(&self, answer_id: Uuid, user_id: Uuid, kind: InteractionKind) -> Result<(), BackendError> {
        let mut answer = self
            .answers
            .get_mut(&answer_id)
            .ok_or(BackendError::Missing("answer"))?;

        let key = (user_id, answer_id);
        let previous = self.answer_votes.get(&key).map(|v| *v);
        let change = VoteChange::resolve(previous, kind);

        match change.next {
            Some(next) => self.answer_votes.insert(key, next),
            None => self.answer_votes.remove(&key).map(|(_, v)| v),
        };
        answer.row.likes += change.likes;
        answer.row.dislikes += change.dislikes;

        Ok(())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn list_posts(&self, filter: PostFilter) -> Result<Vec<PostRow>, BackendError> {
        let mut posts: Vec<Stored<PostRow>> = self
            .posts
            .iter()
            .filter(|p| filter.user_id.is_none() || p.row.user_id == filter.user_id)
            .map(|p| p.value().clone())
            .collect();

        // Newest first
        posts.sort_by(|a, b| (b.row.created_at, b.seq).cmp(&(a.row.created_at, a.seq)));

        Ok(posts
            .into_iter()
            .map(|p| self.with_answers(p.row))
            .collect())
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<PostRow>, BackendError> {
        let row = self.posts.get(&id).map(|p| p.row.clone());
        Ok(row.map(|r| self.with_answers(r)))
    }

    async fn insert_post(&self, post: NewPostRow) -> Result<PostRow, BackendError> {
        let row = PostRow {
            id: Uuid::new_v4(),
            user_id: Some(post.user_id),
            title: post.title,
            description: post.description,
            category: post.category.to_string(),
            likes: 0,
            dislikes: 0,
            image_url: post.image_url,
            created_at: Utc::now(),
            answers: Vec::new(),
        };

        let seq = self.next_seq();
        self.posts.insert(row.id, Stored { row: row.clone(), seq });
        self.record_mutation();

        Ok(row)
    }

    async fn update_post(&self, id: Uuid, patch: PostPatch) -> Result<PostRow, BackendError> {
        let row = {
            let mut post = self.posts.get_mut(&id).ok_or(BackendError::Missing("post"))?;
            post.row.title = patch.title;
            post.row.description = patch.description;
            post.row.category = patch.category.to_string();
            post.row.clone()
        };
        self.record_mutation();

        Ok(self.with_answers(row))
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), BackendError> {
        self.posts.remove(&id);

        let mut removed = Vec::new();
        self.answers.retain(|answer_id, answer| {
            let keep = answer.row.post_id != id;
            if !keep {
                removed.push(*answer_id);
            }
            keep
        });
        self.post_votes.retain(|(_, post_id), _| *post_id != id);
        self.answer_votes
            .retain(|(_, answer_id), _| !removed.contains(answer_id));
        self.record_mutation();

        Ok(())
    }

    async fn get_answer(&self, id: Uuid) -> Result<Option<AnswerRow>, BackendError> {
        Ok(self.answers.get(&id).map(|a| a.row.clone()))
    }

    async fn insert_answer(&self, answer: NewAnswerRow) -> Result<AnswerRow, BackendError> {
        // Held until the answer is stored so a concurrent delete cannot orphan it.
        let _post = self
            .posts
            .get(&answer.post_id)
            .ok_or(BackendError::Missing("post"))?;

        let row = AnswerRow {
            id: Uuid::new_v4(),
            post_id: answer.post_id,
            user_id: Some(answer.user_id),
            content: answer.content,
            likes: 0,
            dislikes: 0,
            created_at: Utc::now(),
        };

        let seq = self.next_seq();
        self.answers.insert(row.id, Stored { row: row.clone(), seq });
        self.record_mutation();

        Ok(row)
    }

    async fn list_user_answers(&self, user_id: Uuid) -> Result<Vec<UserAnswerRow>, BackendError> {
        let mut answers: Vec<Stored<AnswerRow>> = self
            .answers
            .iter()
            .filter(|a| a.row.user_id == Some(user_id))
            .map(|a| a.value().clone())
            .collect();
        answers.sort_by(|a, b| (b.row.created_at, b.seq).cmp(&(a.row.created_at, a.seq)));

        Ok(answers
            .into_iter()
            .map(|a| {
                let posts = self.posts.get(&a.row.post_id).map(|p| PostRefRow {
                    id: p.row.id,
                    title: p.row.title.clone(),
                });
                UserAnswerRow {
                    id: a.row.id,
                    post_id: a.row.post_id,
                    content: a.row.content,
                    likes: a.row.likes,
                    dislikes: a.row.dislikes,
                    created_at: a.row.created_at,
                    posts,
                }
            })
            .collect())
    }

    async fn get_profiles(&self, user_ids: &[Uuid]) -> Result<Vec<ProfileRow>, BackendError> {
        Ok(user_ids
            .iter()
            .filter_map(|id| self.profiles.get(id).map(|p| p.clone()))
            .collect())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        patch: ProfilePatch,
    ) -> Result<(), BackendError> {
        let mut profile = self.profiles.entry(user_id).or_insert_with(|| ProfileRow {
            user_id,
            display_name: None,
            avatar_url: None,
        });

        if let Some(name) = patch.display_name {
            profile.display_name = Some(name);
        }
        if let Some(url) = patch.avatar_url {
            profile.avatar_url = Some(url);
        }
        drop(profile);
        self.record_mutation();

        Ok(())
    }

    async fn list_interactions(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> Result<Vec<InteractionRow>, BackendError> {
        Ok(post_ids
            .iter()
            .filter_map(|post_id| {
                self.post_vote(user_id, *post_id)
                    .map(|interaction_type| InteractionRow {
                        post_id: *post_id,
                        interaction_type,
                    })
            })
            .collect())
    }

    async fn call(
        &self,
        procedure: Procedure,
        target: Uuid,
        user_id: Uuid,
    ) -> Result<(), BackendError> {
        match procedure.target() {
            Target::Post => self.vote_post(target, user_id, procedure.kind())?,
            Target::Answer => self.vote_answer(target, user_id, procedure.kind())?,
        }
        self.record_mutation();

        Ok(())
    }

    async fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        object: ObjectUpload,
    ) -> Result<(), BackendError> {
        let key = (bucket, path.to_string());
        if !object.upsert && self.objects.contains_key(&key) {
            return Err(BackendError::Status {
                status: 409,
                message: format!("{bucket}/{path} already exists"),
            });
        }

        self.objects.insert(
            key,
            StoredObject {
                bytes: object.bytes,
                content_type: object.content_type,
            },
        );
        self.record_mutation();

        Ok(())
    }

    fn public_url(&self, bucket: Bucket, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.public_base, bucket, path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use std::sync::Arc;

    fn new_post(user_id: Uuid, title: &str) -> NewPostRow {
        NewPostRow {
            user_id,
            title: title.into(),
            description: "details".into(),
            category: Category::Technology,
            image_url: None,
        }
    }

    #[test]
    fn vote_resolution_table() {
        use InteractionKind::*;
        assert_eq!(VoteChange::resolve(None, Like).next, Some(Like));
        assert_eq!(VoteChange::resolve(Some(Like), Like).likes, -1);
        assert_eq!(VoteChange::resolve(Some(Like), Like).next, None);

        let switch = VoteChange::resolve(Some(Like), Dislike);
        assert_eq!((switch.likes, switch.dislikes), (-1, 1));
        assert_eq!(switch.next, Some(Dislike));
    }

    #[tokio::test]
    async fn repeated_like_toggles_instead_of_double_counting() {
        let backend = MemoryBackend::new("http://localhost");
        let user = Uuid::new_v4();
        let post = backend.insert_post(new_post(user, "q")).await.unwrap();

        backend.call(Procedure::IncrementPostLikes, post.id, user).await.unwrap();
        let row = backend.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(row.likes, 1);
        assert_eq!(backend.post_vote(user, post.id), Some(InteractionKind::Like));

        backend.call(Procedure::IncrementPostLikes, post.id, user).await.unwrap();
        let row = backend.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(row.likes, 0);
        assert_eq!(backend.post_vote(user, post.id), None);
    }

    #[tokio::test]
    async fn switching_vote_moves_the_count() {
        let backend = MemoryBackend::new("http://localhost");
        let user = Uuid::new_v4();
        let post = backend.insert_post(new_post(user, "q")).await.unwrap();

        backend.call(Procedure::IncrementPostLikes, post.id, user).await.unwrap();
        backend.call(Procedure::IncrementPostDislikes, post.id, user).await.unwrap();

        let row = backend.get_post(post.id).await.unwrap().unwrap();
        assert_eq!((row.likes, row.dislikes), (0, 1));
    }

    #[tokio::test]
    async fn concurrent_likes_from_distinct_users_all_count() {
        let backend = Arc::new(MemoryBackend::new("http://localhost"));
        let post = backend
            .insert_post(new_post(Uuid::new_v4(), "busy"))
            .await
            .unwrap();

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let backend = backend.clone();
                tokio::spawn(async move {
                    backend
                        .call(Procedure::IncrementPostLikes, post.id, Uuid::new_v4())
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let row = backend.get_post(post.id).await.unwrap().unwrap();
        assert_eq!(row.likes, 32);
    }

    #[tokio::test]
    async fn voting_on_missing_target_fails() {
        let backend = MemoryBackend::new("http://localhost");
        let err = backend
            .call(Procedure::IncrementAnswerLikes, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Missing("answer")));
        assert_eq!(backend.mutations(), 0);
    }

    #[tokio::test]
    async fn delete_cascades_to_answers_and_votes() {
        let backend = MemoryBackend::new("http://localhost");
        let user = Uuid::new_v4();
        let post = backend.insert_post(new_post(user, "q")).await.unwrap();
        let answer = backend
            .insert_answer(NewAnswerRow {
                post_id: post.id,
                user_id: user,
                content: "a".into(),
            })
            .await
            .unwrap();
        backend.call(Procedure::IncrementPostLikes, post.id, user).await.unwrap();

        backend.delete_post(post.id).await.unwrap();

        assert!(backend.get_post(post.id).await.unwrap().is_none());
        assert!(backend.get_answer(answer.id).await.unwrap().is_none());
        assert_eq!(backend.post_vote(user, post.id), None);
    }

    #[tokio::test]
    async fn answering_missing_post_fails_without_writing() {
        let backend = MemoryBackend::new("http://localhost");
        let err = backend
            .insert_answer(NewAnswerRow {
                post_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                content: "a".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BackendError::Missing("post")));
        assert_eq!(backend.mutations(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn answers_racing_a_delete_are_never_orphaned() {
        let backend = Arc::new(MemoryBackend::new("http://localhost"));
        let user = Uuid::new_v4();

        for _ in 0..20 {
            let post = backend.insert_post(new_post(user, "q")).await.unwrap();
            let writers: Vec<_> = (0..8)
                .map(|_| {
                    let backend = backend.clone();
                    tokio::spawn(async move {
                        backend
                            .insert_answer(NewAnswerRow {
                                post_id: post.id,
                                user_id: Uuid::new_v4(),
                                content: "a".into(),
                            })
                            .await
                    })
                })
                .collect();
            backend.delete_post(post.id).await.unwrap();
            for writer in writers {
                let _ = writer.await.unwrap();
            }
        }

        let orphans = backend
            .answers
            .iter()
            .filter(|a| !backend.posts.contains_key(&a.row.post_id))
            .count();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn lists_newest_first_and_filters_by_owner() {
        let backend = MemoryBackend::new("http://localhost");
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        backend.insert_post(new_post(alice, "first")).await.unwrap();
        backend.insert_post(new_post(bob, "second")).await.unwrap();
        backend.insert_post(new_post(alice, "third")).await.unwrap();

        let titles: Vec<_> = backend
            .list_posts(PostFilter::all())
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, ["third", "second", "first"]);

        let mine = backend.list_posts(PostFilter::owned_by(alice)).await.unwrap();
        assert_eq!(mine.len(), 2);
    }

    #[tokio::test]
    async fn upload_without_upsert_refuses_to_overwrite() {
        let backend = MemoryBackend::new("http://localhost/");
        let object = ObjectUpload {
            bytes: Bytes::from_static(b"png"),
            content_type: "image/png".into(),
            upsert: false,
        };

        backend.upload(Bucket::PostImages, "a.png", object.clone()).await.unwrap();
        assert!(backend.upload(Bucket::PostImages, "a.png", object).await.is_err());
        assert_eq!(
            backend.public_url(Bucket::PostImages, "a.png"),
            "http://localhost/storage/v1/object/public/post-images/a.png"
        );
    }
}
