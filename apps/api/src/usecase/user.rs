//! # ユーザーユースケース
//!
//! ユーザーの取得・更新・削除を実装する。
//! 取得・更新・削除はいずれも「本人またはアプリ管理者」のみ許可する。

use std::sync::Arc;

use kaizenboard_domain::{
    clock::Clock,
    user::{Email, User, UserId},
    value_objects::UserName,
};
use kaizenboard_infra::{
    repository::UserRepository,
    session::{SessionData, SessionManager},
};

use crate::error::ApiError;

/// ユーザーユースケース
pub struct UserUseCase {
    users:    Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionManager>,
    clock:    Arc<dyn Clock>,
}

impl UserUseCase {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            sessions,
            clock,
        }
    }

    /// 本人またはアプリ管理者であることを要求する
    fn ensure_self_or_admin(actor: &SessionData, target: &UserId) -> Result<(), ApiError> {
        if actor.user_id() == target || actor.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "本人または管理者のみ操作できます".to_string(),
            ))
        }
    }

    /// ユーザーを取得する
    pub async fn get(&self, actor: &SessionData, id: &UserId) -> Result<User, ApiError> {
        Self::ensure_self_or_admin(actor, id)?;

        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("ユーザーが見つかりません: {id}")))
    }

    /// プロフィールを更新する
    ///
    /// ゲストユーザーへのメールアドレス設定は許可しない
    /// （登録フローを経由する必要がある）。
    pub async fn update_profile(
        &self,
        actor: &SessionData,
        id: &UserId,
        name: &str,
        email: Option<&str>,
    ) -> Result<User, ApiError> {
        Self::ensure_self_or_admin(actor, id)?;

        let user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("ユーザーが見つかりません: {id}")))?;

        let name = UserName::new(name)?;
        let email = match email {
            Some(value) => {
                if user.is_guest() {
                    return Err(ApiError::BadRequest(
                        "ゲストユーザーにはメールアドレスを設定できません".to_string(),
                    ));
                }
                Some(Email::new(value)?)
            }
            None => user.email().cloned(),
        };

        let updated = user.with_profile(name, email, self.clock.now());
        self.users.update(&updated).await.map_err(|e| {
            if e.as_conflict().is_some() {
                ApiError::Conflict("このメールアドレスは既に使用されています".to_string())
            } else {
                ApiError::Infra(e)
            }
        })?;

        Ok(updated)
    }

    /// ユーザーを削除する
    ///
    /// 認証情報・メンバーシップは DB のカスケードで削除され、
    /// 発行済みのセッションもすべて失効させる。
    pub async fn delete(&self, actor: &SessionData, id: &UserId) -> Result<(), ApiError> {
        Self::ensure_self_or_admin(actor, id)?;

        let user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("ユーザーが見つかりません: {id}")))?;

        self.users.delete(user.id()).await?;
        self.sessions.delete_all_for_user(id).await?;

        Ok(())
    }
}
