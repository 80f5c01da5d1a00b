use crate::article::Article;

/// True when the article has a non-empty title or a non-empty description.
pub fn has_displayable_text(article: &Article) -> bool {
    let non_empty = |value: &Option<String>| value.as_deref().is_some_and(|s| !s.is_empty());
    non_empty(&article.title) || non_empty(&article.description)
}

/// Drops articles with neither a title nor a description, preserving order.
pub fn filter_articles(articles: Vec<Article>) -> Vec<Article> {
    articles.into_iter().filter(has_displayable_text).collect()
}
