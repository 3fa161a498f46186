mod requests;
mod responses;

pub use requests::{
    ContactRequest, CreateAnswerRequest, CreatePostRequest, FeedQuery, InteractionsQuery,
    ReportRequest, UpdatePostRequest, UpdateProfileRequest,
};
pub use responses::{
    ActionResponse, InteractionResponse, Notice, NoticeVariant, PaginatedResponse,
    ProfileOverview, UploadResponse,
};
