use async_trait::async_trait;

/// 外部の認証コラボレータから資格情報を受け取るための境界。
///
/// 同期コアはトークンの取得方法を知らない。付与できるトークンがあるなら
/// `Some`、無認証なら `None` を返すだけでよい。
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn bearer_token(&self) -> Option<String>;
}
