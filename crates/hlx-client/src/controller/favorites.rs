//! Favorites controller. Names only.

use tracing::warn;

use hlx_model::{FavoriteModel, SetOutcome};
use hlx_proto::{Kind, Request, Response};

use crate::event::StateChange;

pub(crate) struct FavoritesController {
    favorites: Vec<FavoriteModel>,
}

impl FavoritesController {
    pub(crate) fn new() -> FavoritesController {
        FavoritesController {
            favorites: Kind::Favorite
                .all()
                .map(|_| FavoriteModel::default())
                .collect(),
        }
    }

    pub(crate) fn models(&self) -> &[FavoriteModel] {
        &self.favorites
    }

    pub(crate) fn refresh_queries(&self) -> Vec<Request> {
        Kind::Favorite
            .all()
            .map(|favorite| Request::QueryFavorite { favorite })
            .collect()
    }

    pub(crate) fn handle(&mut self, response: &Response) -> Option<StateChange> {
        let Response::FavoriteName { favorite, name } = response else {
            return None;
        };
        let model = self
            .favorites
            .get_mut(favorite.get().checked_sub(1)? as usize)?;
        match model.set_name(name) {
            Ok(SetOutcome::Applied) => Some(StateChange::FavoriteName {
                favorite: *favorite,
                name: name.clone(),
            }),
            Ok(SetOutcome::AlreadySet) => None,
            Err(error) => {
                warn!(favorite = %favorite, %error, "rejected favorite notification");
                None
            }
        }
    }
}
