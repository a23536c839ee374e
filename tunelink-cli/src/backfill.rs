use std::time::Duration;

use tunelink::{
    CatalogEntity, ContentLink, EntityDetail, EntityId, EntitySummary, PlatformDetail,
    RankedItem, Result, SearchQuery,
};

// the cli treats a search query as the "owner" of its results and uses each result's
// canonical url as its entity id, so details can be looked up through link resolution.

#[derive(Debug, Clone)]
pub struct SearchLister(pub tunelink::Context);

#[tunelink::async_trait]
impl tunelink::EntityLister for SearchLister {
    async fn list_for_owner(
        &self,
        owner_id: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<EntitySummary>> {
        let results = self
            .0
            .search()
            .search(&SearchQuery::new(owner_id))
            .await
            .map_err(tunelink::Error::wrap)?;
        Ok(tunelink::rank(&results, owner_id)
            .into_iter()
            .filter_map(|item| {
                let url = item.external_urls.values().next()?.clone();
                Some(EntitySummary {
                    id: EntityId::new(url),
                    kind: item.kind,
                    artwork_url: item.artwork_url,
                })
            })
            .skip(page * page_size)
            .take(page_size)
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct LinkFetcher(pub tunelink::Context);

#[tunelink::async_trait]
impl tunelink::EntityDetailFetcher for LinkFetcher {
    async fn fetch_by_id(&self, id: &EntityId, _timeout: Duration) -> Result<EntityDetail> {
        let link = ContentLink::parse(id.as_str())?;
        let entity = self.0.search().resolve(id.as_str()).await?;
        Ok(entity_detail(&link, &entity))
    }
}

pub fn ranked(entity: &CatalogEntity) -> RankedItem {
    match entity {
        CatalogEntity::Track(track) => RankedItem::from(track),
        CatalogEntity::Album(album) => RankedItem::from(album),
        CatalogEntity::Artist(artist) => RankedItem::from(artist),
        CatalogEntity::Playlist(playlist) => RankedItem::from(playlist),
    }
}

fn entity_detail(link: &ContentLink, entity: &CatalogEntity) -> EntityDetail {
    let mut detail = EntityDetail::default();
    detail.platforms.insert(
        link.platform.as_str().to_owned(),
        PlatformDetail {
            artwork_url: ranked(entity).artwork_url,
            thumbnail_url: None,
        },
    );
    detail
}
