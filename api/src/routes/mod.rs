pub mod answer;
pub mod contact;
pub mod health;
pub mod interaction;
pub mod post;
pub mod profile;
