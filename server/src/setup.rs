use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use sqlx::SqlitePool;

use crate::database::articles::NewArticle;
use crate::database::users::NewUser;
use crate::database::{self, articles, categories, users, utils};

/// First-run interactive setup: rebuild the schema from scratch, seed the
/// fixed rows, and prompt on stdin for the first (admin) user.
///
/// Destructive on purpose — running it drops every existing table.
pub async fn initialize_blog(pool: &SqlitePool) -> Result<()> {
    println!(
        "Welcome to blog initialization. If you have already run this,\n\
         restart without --init or your data will be dropped.\n\
         \n\
         This setup will prompt you for some information in order to set up\n\
         the blog for the first time. Follow the instructions and you will\n\
         have a working blog."
    );

    println!("Initializing tables...");

    // Articles first: it references everything else.
    for table in ["articles", "users", "categories", "roles"] {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await
            .with_context(|| format!("Could not drop table {}", table))?;
    }

    database::create_tables(pool).await?;
    let category_id = categories::insert_category(pool, "Test")
        .await
        .context("Could not populate category table")?;

    let stdin = io::stdin();
    let username = prompt(&stdin, "What is the username you would like to use? ")?;
    if !utils::is_valid_username(&username) {
        bail!("Username must be 3-20 alphanumeric characters");
    }

    let real_name = prompt(&stdin, "What is the real name you would like to use? ")?;
    let email = prompt(&stdin, "What is the email you would like to use? ")?;

    // Plain stdin read — the password is visible while typed.
    let password = prompt(&stdin, "What is the password for your user? ")?;
    if password.is_empty() {
        bail!("Password must not be empty");
    }

    let author_id = users::insert_user(
        pool,
        &NewUser {
            username,
            password_hash: utils::hash_password(&password)?,
            real_name: Some(real_name).filter(|s| !s.is_empty()),
            email: Some(email).filter(|s| !s.is_empty()),
            role: "admin".to_string(),
        },
    )
    .await
    .context("Could not save user")?;

    articles::insert_article(
        pool,
        &NewArticle {
            title: "Test".to_string(),
            author_id,
            body: "This is a test".to_string(),
            slug: "test".to_string(),
            category_id,
        },
    )
    .await
    .context("Could not create sample article")?;

    println!("Done.");

    Ok(())
}

fn prompt(stdin: &io::Stdin, message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush().context("Could not flush stdout")?;

    let mut line = String::new();
    stdin
        .lock()
        .read_line(&mut line)
        .context("Could not read input")?;

    Ok(line.trim().to_string())
}
