//! Built-in sample content: the last tier of the fallback chain, served
//! when neither the spreadsheet, the cached rows, nor local edits yield
//! anything.

use crate::domain::entities::{ExperienceRecord, PostRecord};
use crate::domain::types::Language;

use super::content::DEFAULT_IMAGE_URL;

pub fn sample_posts(language: Language) -> Vec<PostRecord> {
    let read_time = |minutes: u8| match language {
        Language::En => format!("{minutes} min read"),
        Language::Es => format!("{minutes} min de lectura"),
    };

    vec![
        PostRecord {
            id: "1".to_string(),
            language,
            title: "Building Modern AI Applications with Machine Learning".to_string(),
            excerpt: "Exploring the benefits of using AI and machine learning for building \
                      intelligent and scalable applications."
                .to_string(),
            content: "Artificial Intelligence has become an essential tool for modern business \
                      automation. In this post, we explore how to leverage AI and machine \
                      learning to build applications that are not only intelligent but also \
                      scalable and efficient.\n\nKey benefits include:\n- Automated decision \
                      making\n- Predictive analytics\n- Enhanced user experiences\n- Reduced \
                      operational costs\n\nBy implementing these technologies correctly, \
                      businesses can transform their operations and stay competitive in the \
                      digital age."
                .to_string(),
            date: "January 15, 2024".to_string(),
            read_time: read_time(5),
            image_url: DEFAULT_IMAGE_URL.to_string(),
            video_url: Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string()),
        },
        PostRecord {
            id: "2".to_string(),
            language,
            title: "Data Visualization Best Practices for Business Intelligence".to_string(),
            excerpt: "Learn how to create compelling dashboards and reports that drive business \
                      decisions."
                .to_string(),
            content: "Effective data visualization is crucial for business intelligence success. \
                      This guide covers the essential principles and best practices for creating \
                      dashboards that actually get used.\n\nCore principles:\n- Know your \
                      audience\n- Choose the right chart types\n- Keep it simple and focused\n- \
                      Use color strategically\n- Tell a story with your data\n\nWhen done right, \
                      data visualization transforms raw numbers into actionable insights that \
                      drive business growth."
                .to_string(),
            date: "December 28, 2023".to_string(),
            read_time: read_time(7),
            image_url: "https://images.pexels.com/photos/590022/pexels-photo-590022.jpeg?auto=compress&cs=tinysrgb&w=800"
                .to_string(),
            video_url: None,
        },
        PostRecord {
            id: "3".to_string(),
            language,
            title: "Automating Business Processes with AI Agents".to_string(),
            excerpt: "Discover how AI agents can streamline your workflows and reduce manual \
                      tasks."
                .to_string(),
            content: "AI agents are revolutionizing how businesses handle repetitive tasks and \
                      complex workflows. This comprehensive guide shows you how to implement AI \
                      automation in your organization.\n\nTypes of AI agents:\n- Chatbots for \
                      customer service\n- Document processing agents\n- Workflow automation \
                      bots\n- Predictive maintenance systems\n\nThe key is starting small, \
                      measuring results, and scaling what works. AI agents can save thousands \
                      of hours annually while improving accuracy and consistency."
                .to_string(),
            date: "December 10, 2023".to_string(),
            read_time: read_time(6),
            image_url: "https://images.pexels.com/photos/3861969/pexels-photo-3861969.jpeg?auto=compress&cs=tinysrgb&w=800"
                .to_string(),
            video_url: Some("https://youtu.be/ScMzIvxBSi4".to_string()),
        },
    ]
}

pub fn sample_experience() -> Vec<ExperienceRecord> {
    vec![
        ExperienceRecord {
            id: "1".to_string(),
            role: "AI Consultant & Data Strategist".to_string(),
            company: "Independent Consultant".to_string(),
            period: "2023 - Present".to_string(),
            location: "Buenos Aires, Argentina".to_string(),
            description: "Helping businesses transform manual workflows into intelligent, \
                          automated systems using AI agents, machine learning, and data \
                          visualization. Specializing in cost reduction and decision-making \
                          acceleration through smart technology implementation."
                .to_string(),
            photo_url: "https://images.pexels.com/photos/2379004/pexels-photo-2379004.jpeg?auto=compress&cs=tinysrgb&w=150&h=150&fit=crop&crop=face"
                .to_string(),
        },
        ExperienceRecord {
            id: "2".to_string(),
            role: "Senior Data Analyst".to_string(),
            company: "Global Tech Solutions".to_string(),
            period: "2021 - 2023".to_string(),
            location: "Remote".to_string(),
            description: "Built advanced analytics dashboards and predictive models using R, \
                          Python, and Power BI. Automated reporting processes that saved 40+ \
                          hours per week and improved decision-making speed by 60%."
                .to_string(),
            photo_url: "https://images.pexels.com/photos/1239291/pexels-photo-1239291.jpeg?auto=compress&cs=tinysrgb&w=150&h=150&fit=crop&crop=face"
                .to_string(),
        },
        ExperienceRecord {
            id: "3".to_string(),
            role: "Business Intelligence Developer".to_string(),
            company: "Enterprise Analytics Corp".to_string(),
            period: "2019 - 2021".to_string(),
            location: "Buenos Aires, Argentina".to_string(),
            description: "Designed and implemented data warehouses and ETL processes. Created \
                          interactive dashboards that transformed raw data into actionable \
                          business insights for C-level executives."
                .to_string(),
            photo_url: "https://images.pexels.com/photos/1181686/pexels-photo-1181686.jpeg?auto=compress&cs=tinysrgb&w=150&h=150&fit=crop&crop=face"
                .to_string(),
        },
    ]
}
