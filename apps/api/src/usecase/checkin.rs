//! # チェックインユースケース
//!
//! 日次チェックインの作成・取得・更新・削除を実装する。
//!
//! ## 認可ルール
//!
//! - 作成・参照: チームメンバーのみ
//! - 更新: 投稿者本人のみ
//! - 削除: 投稿者本人、チーム管理者、またはアプリ管理者

use std::sync::Arc;

use chrono::NaiveDate;
use kaizenboard_domain::{
    checkin::{Checkin, CheckinContent, CheckinId},
    clock::Clock,
    team::TeamId,
};
use kaizenboard_infra::{
    repository::{CheckinRepository, TeamRepository},
    session::SessionData,
};

use crate::error::ApiError;

/// チェックイン本文の入力
#[derive(Debug, Clone)]
pub struct CheckinContentInput {
    pub yesterday: String,
    pub today:     String,
    pub blockers:  String,
    pub discuss:   String,
    pub goals_met: bool,
}

impl CheckinContentInput {
    fn into_content(self) -> Result<CheckinContent, ApiError> {
        Ok(CheckinContent::new(
            self.yesterday,
            self.today,
            self.blockers,
            self.discuss,
            self.goals_met,
        )?)
    }
}

/// チェックインユースケース
pub struct CheckinUseCase {
    checkins: Arc<dyn CheckinRepository>,
    teams:    Arc<dyn TeamRepository>,
    clock:    Arc<dyn Clock>,
}

impl CheckinUseCase {
    pub fn new(
        checkins: Arc<dyn CheckinRepository>,
        teams: Arc<dyn TeamRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            checkins,
            teams,
            clock,
        }
    }

    /// チェックインを投稿する
    ///
    /// 日付省略時は今日の日付を使用する。同一日に投稿済みの場合は
    /// Conflict エラーになる。
    pub async fn create(
        &self,
        actor: &SessionData,
        team_id: &TeamId,
        date: Option<NaiveDate>,
        content: CheckinContentInput,
    ) -> Result<Checkin, ApiError> {
        self.ensure_team_member(actor, team_id).await?;

        let now = self.clock.now();
        let date = date.unwrap_or_else(|| now.date_naive());
        let checkin = Checkin::new(
            team_id.clone(),
            actor.user_id().clone(),
            date,
            content.into_content()?,
            now,
        );

        self.checkins.insert(&checkin).await.map_err(|e| {
            if e.as_conflict().is_some() {
                ApiError::Conflict(
                    "この日のチェックインは既に投稿されています".to_string(),
                )
            } else {
                ApiError::Infra(e)
            }
        })?;

        Ok(checkin)
    }

    /// チームの指定日のチェックイン一覧を取得する
    ///
    /// 日付省略時は今日の分を返す。
    pub async fn list_for_team(
        &self,
        actor: &SessionData,
        team_id: &TeamId,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Checkin>, ApiError> {
        self.ensure_team_member(actor, team_id).await?;

        let date = date.unwrap_or_else(|| self.clock.now().date_naive());
        Ok(self.checkins.list_for_team_on(team_id, date).await?)
    }

    /// チェックインを取得する
    pub async fn get(
        &self,
        actor: &SessionData,
        team_id: &TeamId,
        id: &CheckinId,
    ) -> Result<Checkin, ApiError> {
        self.ensure_team_member(actor, team_id).await?;
        self.find_checkin_in(team_id, id).await
    }

    /// チェックインの本文を更新する
    pub async fn update(
        &self,
        actor: &SessionData,
        team_id: &TeamId,
        id: &CheckinId,
        content: CheckinContentInput,
    ) -> Result<Checkin, ApiError> {
        self.ensure_team_member(actor, team_id).await?;
        let checkin = self.find_checkin_in(team_id, id).await?;

        if !checkin.is_authored_by(actor.user_id()) {
            return Err(ApiError::Forbidden(
                "本人のみチェックインを編集できます".to_string(),
            ));
        }

        let updated = checkin.with_content(content.into_content()?, self.clock.now());
        self.checkins.update(&updated).await?;
        Ok(updated)
    }

    /// チェックインを削除する
    pub async fn delete(
        &self,
        actor: &SessionData,
        team_id: &TeamId,
        id: &CheckinId,
    ) -> Result<(), ApiError> {
        self.ensure_team_member(actor, team_id).await?;
        let checkin = self.find_checkin_in(team_id, id).await?;

        if !checkin.is_authored_by(actor.user_id()) && !actor.is_admin() {
            let is_team_admin = self
                .teams
                .find_member_role(team_id, actor.user_id())
                .await?
                .is_some_and(|role| role.is_admin());
            if !is_team_admin {
                return Err(ApiError::Forbidden(
                    "本人またはチーム管理者のみ削除できます".to_string(),
                ));
            }
        }

        self.checkins.delete(id).await?;
        Ok(())
    }

    // --- 内部ヘルパー ---

    /// チームに属するチェックインを取得する
    ///
    /// 別チームのチェックイン ID を指定された場合も 404 を返す。
    async fn find_checkin_in(
        &self,
        team_id: &TeamId,
        id: &CheckinId,
    ) -> Result<Checkin, ApiError> {
        self.checkins
            .find_by_id(id)
            .await?
            .filter(|c| c.team_id() == team_id)
            .ok_or_else(|| {
                ApiError::NotFound(format!("チェックインが見つかりません: {id}"))
            })
    }

    async fn ensure_team_member(
        &self,
        actor: &SessionData,
        team_id: &TeamId,
    ) -> Result<(), ApiError> {
        if actor.is_admin() {
            return Ok(());
        }

        self.teams
            .find_member_role(team_id, actor.user_id())
            .await?
            .map(|_| ())
            .ok_or_else(|| {
                ApiError::Forbidden("チームのメンバーではありません".to_string())
            })
    }
}
