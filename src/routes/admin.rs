use actix_session::Session;
use actix_web::http::StatusCode;
use actix_web::{get, web, Responder};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::models::visitor::{StatsWindows, VisitorStats};
use crate::routes::view;
use crate::store::SiteStore;
use crate::utils::flash;
use crate::utils::session::AdminIdentity;

/// Nombre de visites par page de la liste des visiteurs
pub const VISITS_PER_PAGE: i64 = 20;

/// Nombre de messages récents affichés sur le tableau de bord
const RECENT_MESSAGES: i64 = 5;

async fn current_stats(store: &dyn SiteStore) -> VisitorStats {
    store
        .visitor_stats(StatsWindows::at(Utc::now()))
        .await
        .unwrap_or_else(|err| {
            tracing::error!(error = %err, "statistiques visiteurs indisponibles");
            VisitorStats::default()
        })
}

/// Tableau de bord ; chaque bloc se replie sur des valeurs vides en cas d'erreur
async fn dashboard(
    store: web::Data<dyn SiteStore>,
    session: Session,
    user: web::ReqData<AdminIdentity>,
) -> impl Responder {
    let totals = store.totals().await.unwrap_or_else(|err| {
        tracing::error!(error = %err, "compteurs indisponibles");
        Default::default()
    });
    let recent_messages = store
        .list_messages(Some(RECENT_MESSAGES))
        .await
        .unwrap_or_else(|err| {
            tracing::error!(error = %err, "messages récents indisponibles");
            Vec::new()
        });
    let stats = current_stats(store.get_ref()).await;

    view(
        StatusCode::OK,
        "Tableau de bord",
        flash::take(&session),
        json!({
            "admin": user.into_inner(),
            "totals": totals,
            "recentMessages": recent_messages,
            "stats": stats,
        }),
    )
}

#[get("/stats")]
async fn stats_page(
    store: web::Data<dyn SiteStore>,
    session: Session,
    user: web::ReqData<AdminIdentity>,
) -> impl Responder {
    let stats = current_stats(store.get_ref()).await;
    view(
        StatusCode::OK,
        "Statistiques",
        flash::take(&session),
        json!({ "admin": user.into_inner(), "stats": stats }),
    )
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<i64>,
}

/// Liste paginée des visites, les plus récentes d'abord
#[get("/visitors")]
async fn visitors_page(
    store: web::Data<dyn SiteStore>,
    session: Session,
    user: web::ReqData<AdminIdentity>,
    query: web::Query<PageQuery>,
) -> impl Responder {
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1).saturating_mul(VISITS_PER_PAGE);

    let (visits, total) = store
        .list_visits(offset, VISITS_PER_PAGE)
        .await
        .unwrap_or_else(|err| {
            tracing::error!(error = %err, "liste des visiteurs indisponible");
            (Vec::new(), 0)
        });
    let total_pages = total.max(0).saturating_add(VISITS_PER_PAGE - 1) / VISITS_PER_PAGE;

    view(
        StatusCode::OK,
        "Visiteurs",
        flash::take(&session),
        json!({
            "admin": user.into_inner(),
            "visitors": visits,
            "currentPage": page,
            "totalPages": total_pages,
            "total": total,
        }),
    )
}

/// Configuration des routes du tableau de bord
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::get().to(dashboard)));
    cfg.service(stats_page);
    cfg.service(visitors_page);
}

#[cfg(test)]
mod tests {
    use crate::models::message::NewContactMessage;
    use crate::models::visitor::NewVisit;
    use crate::store::SiteStore;
    use crate::test_support::{login, test_app};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use chrono::{Duration, Utc};

    fn visit(n: usize) -> NewVisit {
        NewVisit {
            ip: "10.0.0.1".into(),
            user_agent: None,
            page: format!("/page-{}", n),
            referer: None,
            session_id: Some("s".into()),
        }
    }

    #[actix_web::test]
    async fn dashboard_reports_counts_and_recent_messages() {
        let (app, ctx) = test_app!();
        ctx.store
            .insert_message(NewContactMessage {
                name: "Jane".into(),
                email: "jane@x.com".into(),
                phone: None,
                subject: "Devis".into(),
                message: "Bonjour".into(),
            })
            .await
            .unwrap();
        ctx.store.record_visit(visit(0), Utc::now()).await.unwrap();

        let cookie = login!(app);
        let req = test::TestRequest::get().uri("/admin/").cookie(cookie).to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["totals"]["messages"], 1);
        assert_eq!(body["totals"]["unreadMessages"], 1);
        assert_eq!(body["recentMessages"][0]["subject"], "Devis");
        assert_eq!(body["stats"]["visitorsToday"], 1);
        assert_eq!(body["admin"]["email"], "admin@enno.com");
    }

    #[actix_web::test]
    async fn visitors_are_paginated_by_twenty() {
        let (app, ctx) = test_app!();
        let now = Utc::now();
        for n in 0..25 {
            ctx.store
                .record_visit(visit(n), now - Duration::seconds(n as i64))
                .await
                .unwrap();
        }

        let cookie = login!(app);
        let req = test::TestRequest::get()
            .uri("/admin/visitors?page=2")
            .cookie(cookie)
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["visitors"].as_array().unwrap().len(), 5);
        assert_eq!(body["currentPage"], 2);
        assert_eq!(body["totalPages"], 2);
        assert_eq!(body["total"], 25);
    }

    #[actix_web::test]
    async fn huge_page_number_yields_an_empty_page() {
        let (app, ctx) = test_app!();
        ctx.store.record_visit(visit(0), Utc::now()).await.unwrap();

        let cookie = login!(app);
        let req = test::TestRequest::get()
            .uri("/admin/visitors?page=9223372036854775807")
            .cookie(cookie)
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert!(body["visitors"].as_array().unwrap().is_empty());
        assert_eq!(body["totalPages"], 1);
        assert_eq!(body["total"], 1);
    }

    #[actix_web::test]
    async fn stats_page_ranks_pages() {
        let (app, ctx) = test_app!();
        let now = Utc::now();
        for sid in ["a", "b"] {
            let mut v = visit(1);
            v.session_id = Some(sid.into());
            ctx.store.record_visit(v, now).await.unwrap();
        }
        ctx.store.record_visit(visit(2), now).await.unwrap();

        let cookie = login!(app);
        let req = test::TestRequest::get().uri("/admin/stats").cookie(cookie).to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["stats"]["topPages"][0]["page"], "/page-1");
        assert_eq!(body["stats"]["topPages"][0]["visits"], 2);
        assert_eq!(body["stats"]["uniqueVisitorsToday"], 1);
    }
}
