use clap::{Parser, Subcommand};
use coursehub::auth::UserRole;
use coursehub::error::AppResult;
use coursehub::model::entity::{
    Chapter, ChapterCreate, ContentItem, ContentItemCreate, ContentType, Course, CourseCreateUpdate,
    CourseStatus, Domain, DomainCreateUpdate, Module, ModuleCreate, UserEntity, UserEntityCreateUpdate,
    normalize_email,
};
use coursehub::model::quiz::QuizDefinition;
use coursehub::model::{CrudRepository, DatabaseError, DatabaseResult, DbConnection, MIGRATOR, ModelManager};
use coursehub::web::AuthenticatedUser;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(about = "CLI tool for seeding the course database", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending migrations
    Migrate,

    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Manage domains
    Domain {
        #[command(subcommand)]
        action: DomainCommands,
    },

    /// Manage courses
    Course {
        #[command(subcommand)]
        action: CourseCommands,
    },

    /// Manage modules
    Module {
        #[command(subcommand)]
        action: ModuleCommands,
    },

    /// Manage chapters
    Chapter {
        #[command(subcommand)]
        action: ChapterCommands,
    },

    /// Manage chapter content
    Content {
        #[command(subcommand)]
        action: ContentCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
        /// admin, sub_admin, trainer or student
        #[arg(long, default_value = "student")]
        role: String,
        /// Domain name
        #[arg(long)]
        domain: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum DomainCommands {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum CourseCommands {
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Email of the owning trainer
        #[arg(long)]
        trainer: Option<String>,
        /// Domain name
        #[arg(long)]
        domain: Option<String>,
        #[arg(long, default_value = "draft")]
        status: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ModuleCommands {
    Add {
        /// Course title to attach the module to
        #[arg(long)]
        course_title: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Zero-based position, appended when omitted
        #[arg(long)]
        order_index: Option<i32>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ChapterCommands {
    Add {
        #[arg(long)]
        course_title: String,
        /// Module title within the course
        #[arg(long)]
        module_title: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        order_index: Option<i32>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ContentCommands {
    Add {
        #[arg(long)]
        course_title: String,
        #[arg(long)]
        chapter_title: String,
        #[arg(long)]
        title: String,
        /// text, video, document, link, quiz or project
        #[arg(long, default_value = "text")]
        content_type: String,
        /// Markdown body, or the quiz definition as JSON for quiz items
        #[arg(long)]
        file: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        order_index: Option<i32>,
    },
}

fn invalid(msg: impl Into<String>) -> DatabaseError {
    DatabaseError::Invalid(msg.into())
}

async fn domain_id(mm: &ModelManager, name: Option<&str>) -> DatabaseResult<Option<Uuid>> {
    let Some(name) = name else {
        return Ok(None);
    };
    let id = sqlx::query_scalar("SELECT id FROM domains WHERE name = $1")
        .bind(name)
        .fetch_optional(mm.executor())
        .await?
        .ok_or_else(|| invalid(format!("no domain named `{name}`")))?;
    Ok(Some(id))
}

async fn course_id(mm: &ModelManager, title: &str) -> DatabaseResult<Uuid> {
    sqlx::query_scalar("SELECT id FROM courses WHERE title = $1")
        .bind(title)
        .fetch_optional(mm.executor())
        .await?
        .ok_or_else(|| invalid(format!("no course titled `{title}`")))
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    let url = std::env::var("DATABASE_URL").map_err(|_| invalid("DATABASE_URL is not set"))?;
    let db_con = DbConnection::connect(&url)?;
    let mm = ModelManager::new(db_con);
    let actor = AuthenticatedUser::admin();

    match args.command {
        Commands::Migrate => {
            MIGRATOR.run(mm.executor()).await?;
            println!("Migrations applied");
        }

        Commands::User { action } => match action {
            UserCommands::Add { email, name, password, role, domain } => {
                let role = UserRole::parse(&role).ok_or_else(|| invalid(format!("unknown role `{role}`")))?;
                let user = UserEntity::create(
                    &mm,
                    &actor,
                    UserEntityCreateUpdate {
                        email: normalize_email(&email),
                        name,
                        password_hash: coursehub::auth::hash_password(&password)?,
                        role,
                        domain_id: domain_id(&mm, domain.as_deref()).await?,
                        is_active: true,
                    },
                )
                .await?;
                println!("User created: {} ({})", user.email(), user.role());
            }
        },

        Commands::Domain { action } => match action {
            DomainCommands::Add { name, description } => {
                let domain = Domain::create(&mm, &actor, DomainCreateUpdate { name, description }).await?;
                println!("Domain created: {:?}", domain);
            }
        },

        Commands::Course { action } => match action {
            CourseCommands::Add { title, description, trainer, domain, status } => {
                let status =
                    CourseStatus::parse(&status).ok_or_else(|| invalid(format!("unknown status `{status}`")))?;
                let trainer_id = match trainer {
                    Some(email) => Some(
                        sqlx::query_scalar("SELECT id FROM users WHERE email = $1 AND role = 'trainer'")
                            .bind(normalize_email(&email))
                            .fetch_optional(mm.executor())
                            .await
                            .map_err(DatabaseError::SqlxError)?
                            .ok_or_else(|| invalid(format!("no trainer with email `{email}`")))?,
                    ),
                    None => None,
                };

                let course = Course::create(
                    &mm,
                    &actor,
                    CourseCreateUpdate {
                        title,
                        description,
                        domain_id: domain_id(&mm, domain.as_deref()).await?,
                        trainer_id,
                        status,
                    },
                )
                .await?;
                println!("Course created: {:?}", course);
            }
        },

        Commands::Module { action } => match action {
            ModuleCommands::Add { course_title, title, description, order_index } => {
                let module = Module::create(
                    &mm,
                    &actor,
                    ModuleCreate {
                        course_id: course_id(&mm, &course_title).await?,
                        title,
                        description,
                        order_index,
                    },
                )
                .await?;
                println!("Module created: {:?}", module);
            }
        },

        Commands::Chapter { action } => match action {
            ChapterCommands::Add { course_title, module_title, title, description, order_index } => {
                let course_id = course_id(&mm, &course_title).await?;
                let module_id: Uuid = sqlx::query_scalar("SELECT id FROM modules WHERE course_id = $1 AND title = $2")
                    .bind(course_id)
                    .bind(&module_title)
                    .fetch_optional(mm.executor())
                    .await
                    .map_err(DatabaseError::SqlxError)?
                    .ok_or_else(|| invalid(format!("no module titled `{module_title}`")))?;

                let chapter = Chapter::create(
                    &mm,
                    &actor,
                    ChapterCreate {
                        module_id,
                        title,
                        description,
                        order_index,
                    },
                )
                .await?;
                println!("Chapter created: {:?}", chapter);
            }
        },

        Commands::Content { action } => match action {
            ContentCommands::Add { course_title, chapter_title, title, content_type, file, url, order_index } => {
                let content_type = ContentType::parse(&content_type)
                    .ok_or_else(|| invalid(format!("unknown content type `{content_type}`")))?;
                let course_id = course_id(&mm, &course_title).await?;
                let chapter_id: Uuid = sqlx::query_scalar(
                    r#"
                    SELECT c.id FROM chapters c
                    JOIN modules m ON m.id = c.module_id
                    WHERE m.course_id = $1 AND c.title = $2
                    "#,
                )
                .bind(course_id)
                .bind(&chapter_title)
                .fetch_optional(mm.executor())
                .await
                .map_err(DatabaseError::SqlxError)?
                .ok_or_else(|| invalid(format!("no chapter titled `{chapter_title}`")))?;

                let text = match file {
                    Some(path) => std::fs::read_to_string(path)?,
                    None => String::new(),
                };
                let (body, quiz) = if content_type == ContentType::Quiz {
                    let quiz: QuizDefinition = serde_json::from_str(&text).map_err(DatabaseError::SerdeError)?;
                    quiz.validate().map_err(invalid)?;
                    (String::new(), Some(quiz))
                } else {
                    (text, None)
                };
                if content_type == ContentType::Link && url.is_none() {
                    return Err(invalid("link items need --url").into());
                }

                let item = ContentItem::create(
                    &mm,
                    &actor,
                    ContentItemCreate {
                        chapter_id,
                        title,
                        content_type,
                        body,
                        url,
                        quiz,
                        order_index,
                    },
                )
                .await?;
                println!("Content created: {} ({})", item.title(), item.content_type().as_str());
            }
        },
    }

    Ok(())
}
