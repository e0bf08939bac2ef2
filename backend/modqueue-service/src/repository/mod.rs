mod postgres_repository;
mod r#trait;

pub use postgres_repository::PostgresPostRepository;
pub use r#trait::PostRepositoryTrait;

#[cfg(test)]
pub use r#trait::MockPostRepositoryTrait;
