use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Genres::Table)
                    .if_not_exists()
                    .col(pk_auto(Genres::Id))
                    .col(string_uniq(Genres::GenreName))
                    .col(big_integer(Genres::CreatedAt))
                    .col(big_integer(Genres::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // release_date holds an ISO calendar date, timestamps are epoch seconds
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(pk_auto(Movies::Id))
                    .col(string(Movies::Title))
                    .col(text(Movies::Description))
                    .col(integer(Movies::Year))
                    .col(string(Movies::ReleaseDate))
                    .col(integer(Movies::Runtime))
                    .col(integer(Movies::Rating))
                    .col(string(Movies::MpaaRating))
                    .col(big_integer(Movies::CreatedAt))
                    .col(big_integer(Movies::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_title")
                    .table(Movies::Table)
                    .col(Movies::Title)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MoviesGenres::Table)
                    .if_not_exists()
                    .col(pk_auto(MoviesGenres::Id))
                    .col(integer(MoviesGenres::MovieId))
                    .col(integer(MoviesGenres::GenreId))
                    .col(big_integer(MoviesGenres::CreatedAt))
                    .col(big_integer(MoviesGenres::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movies_genres_movie")
                            .from(MoviesGenres::Table, MoviesGenres::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movies_genres_genre")
                            .from(MoviesGenres::Table, MoviesGenres::GenreId)
                            .to(Genres::Table, Genres::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(MoviesGenres::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Genres::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    Id,
    Title,
    Description,
    Year,
    ReleaseDate,
    Runtime,
    Rating,
    MpaaRating,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Genres {
    Table,
    Id,
    GenreName,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum MoviesGenres {
    Table,
    Id,
    MovieId,
    GenreId,
    CreatedAt,
    UpdatedAt,
}
